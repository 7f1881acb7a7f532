use dense_layer::matrix::naive::sgemv_naive;
use dense_layer::{
    Blob, InnerProductLayer, KernelVariant, Layer, LayerParameter, MemPool, RuntimeParameter,
};
use proptest::prelude::*;

struct Peer(String);

impl Layer for Peer {
    fn name(&self) -> &str {
        "peer"
    }

    fn type_name(&self) -> &str {
        &self.0
    }

    fn generate_top_blobs(&mut self, bottom: &Blob) -> dense_layer::Result<Blob> {
        Ok(bottom.clone())
    }

    fn forward(&self, _bottom: &Blob, _top: &mut Blob) -> dense_layer::Result<()> {
        Ok(())
    }

    fn forward_reshape(&mut self, _bottom: &Blob, _top: &mut Blob) -> dense_layer::Result<()> {
        Ok(())
    }
}

/// Small integer-valued floats keep every dot product exact in f32.
fn values(len: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec((-8i32..=8).prop_map(|v| v as f32), len)
}

fn problem() -> impl Strategy<Value = (usize, usize, Vec<f32>, Vec<f32>, Vec<f32>)> {
    (1usize..=40, 1usize..=40).prop_flat_map(|(rows, cols)| {
        (
            Just(rows),
            Just(cols),
            values(rows * cols),
            values(cols),
            values(rows),
        )
    })
}

proptest! {
    #[test]
    fn selection_is_pure(
        input_size in 1usize..200,
        output_size in 1usize..200,
        bias in any::<bool>(),
        relu in any::<bool>(),
    ) {
        let v = KernelVariant::for_shape(input_size, output_size, bias, relu);
        let aligned = input_size % 8 == 0 && output_size % 8 == 0;

        prop_assert_eq!(v, KernelVariant::for_shape(input_size, output_size, bias, relu));
        prop_assert_eq!(v.is_aligned(), aligned);
        prop_assert_eq!(v.has_bias(), bias);
        prop_assert_eq!(v.has_relu(), relu);
    }

    #[test]
    fn forward_matches_formula(
        (rows, cols, w, x, b) in problem(),
        bias_term in any::<bool>(),
        fuse_relu in any::<bool>(),
        threads in 1usize..=4,
    ) {
        let mut blobs = vec![Blob::matrix(rows, cols, w.clone())];
        if bias_term {
            blobs.push(Blob::vector(b.clone()));
        }
        let rt = RuntimeParameter::new(threads, MemPool::new());
        let param = LayerParameter::inner_product("fc", bias_term);
        let mut layer = InnerProductLayer::new(&param, &blobs, &rt).unwrap();

        let input = Blob::vector(x.clone());
        let mut output = layer.generate_top_blobs(&input).unwrap();
        if fuse_relu {
            prop_assert!(layer.fuse(&Peer("ReLU".to_string())).unwrap());
        }
        layer.init().unwrap();
        layer.forward(&input, &mut output).unwrap();

        let mut expected = vec![0.0; rows];
        sgemv_naive(&x, &w, bias_term.then_some(&b[..]), &mut expected, fuse_relu);
        prop_assert_eq!(output.data(), &expected[..]);
        prop_assert_eq!(layer.variant(), Some(KernelVariant::for_shape(cols, rows, bias_term, fuse_relu)));
    }

    #[test]
    fn reshape_keeps_flat_output(
        (rows, cols, w, x, _b) in problem(),
        split in 1usize..=4,
    ) {
        let blobs = vec![Blob::matrix(rows, cols, w)];
        let rt = RuntimeParameter::new(1, MemPool::new());
        let mut layer =
            InnerProductLayer::new(&LayerParameter::inner_product("fc", false), &blobs, &rt).unwrap();
        let mut output = layer.generate_top_blobs(&Blob::vector(x.clone())).unwrap();
        layer.init().unwrap();
        let variant = layer.variant();

        // Same element count, different channel/spatial split when it divides evenly
        let (c, h) = if cols % split == 0 { (cols / split, split) } else { (cols, 1) };
        let spatial = Blob::from_vec(1, c, h, 1, x);
        layer.forward_reshape(&spatial, &mut output).unwrap();

        prop_assert_eq!(layer.output_size(), layer.output_channels());
        prop_assert_eq!(output.data_size(), rows);
        prop_assert_eq!(layer.variant(), variant);
    }

    #[test]
    fn fuse_only_accepts_relu(type_name in "[A-Za-z]{1,8}") {
        let blobs = vec![Blob::matrix(2, 2, vec![1.0; 4])];
        let rt = RuntimeParameter::new(1, MemPool::new());
        let mut layer =
            InnerProductLayer::new(&LayerParameter::inner_product("fc", false), &blobs, &rt).unwrap();

        let fused = layer.fuse(&Peer(type_name.clone())).unwrap();
        prop_assert_eq!(fused, type_name == "ReLU");
        prop_assert_eq!(layer.fuse_relu(), fused);
    }
}
