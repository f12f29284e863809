use burn::tensor::{backend::Backend, Data, ElementConversion, Shape, Tensor};

use crate::pipelines::sentiment_analysis::featurizer::SparseVector;

/// Scatter sparse rows into a dense `[rows, dim]` float tensor
pub fn dense_rows<B: Backend>(
    rows: &[SparseVector],
    dim: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let mut values = vec![0.0f32; rows.len() * dim];

    for (row, vector) in rows.iter().enumerate() {
        for (index, value) in vector.iter() {
            values[row * dim + index] = value;
        }
    }

    from_values(values, [rows.len(), dim], device)
}

/// Build a float tensor of the given shape from row-major values
pub fn from_values<B: Backend>(
    values: Vec<f32>,
    shape: [usize; 2],
    device: &B::Device,
) -> Tensor<B, 2> {
    let data: Data<B::FloatElem, 2> = Data::new(
        values.into_iter().map(|value| value.elem()).collect(),
        Shape::new(shape),
    );

    Tensor::from_data(data, device)
}

/// Copy a float tensor back into a flat `Vec<f32>`
pub fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().convert::<f32>().value
}
