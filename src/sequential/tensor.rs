use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use rand::Rng;
use rand_distr::{Normal, Distribution};
use rayon::prelude::*;
use std::fmt;
use serde::{Serialize, Deserialize, Serializer, Deserializer};

pub struct Tensor {
    pub data: Arc<RwLock<Vec<f32>>>,
    pub shape: Vec<usize>,
    pub strides: Vec<usize>
}

impl Tensor {
    pub fn zeros(shape: Vec<usize>) -> Self {
        let data: Vec<f32> = vec![0.0; shape.iter().product()];
        Tensor::from_vec(data, shape)
    }

    // normally distributed values around zero with the given standard deviation
    pub fn random<R: Rng + ?Sized>(shape: Vec<usize>, std_dev: f32, rng: &mut R) -> Self {
        let normal = Normal::new(0.0, std_dev).expect("standard deviation must be finite and non-negative");
        let data: Vec<f32> = (0..shape.iter().product()).map(|_| normal.sample(rng)).collect();
        Tensor::from_vec(data, shape)
    }

    pub fn from_vec(data: Vec<f32>, shape: Vec<usize>) -> Self {
        assert_eq!(data.len(), shape.iter().product::<usize>(), "data length must match shape");
        Self {
            data: Arc::new(RwLock::new(data)),
            strides: Tensor::calc_strides(&shape),
            shape
        }
    }

    // stacks equally sized rows into a [rows, cols] tensor
    pub fn from_rows<T: AsRef<[f32]>>(rows: &[T]) -> Self {
        let num_cols = rows.first().map(|row| row.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * num_cols);
        for row in rows {
            assert_eq!(row.as_ref().len(), num_cols, "rows must have equal length");
            data.extend_from_slice(row.as_ref());
        }
        Tensor::from_vec(data, vec![rows.len(), num_cols])
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<f32>> {
        self.data.read().unwrap()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<f32>> {
        self.data.write().unwrap()
    }

    pub fn rows(&self) -> usize {self.shape[0]}
    pub fn cols(&self) -> usize {self.shape[1]}

    // copy of one row of a contiguous 2D tensor
    pub fn row(&self, index: usize) -> Vec<f32> {
        assert_eq!(self.shape.len(), 2, "row only works for 2D tensors");
        assert!(index < self.shape[0], "row index out of bounds");
        let n = self.shape[1];
        let start = index * self.strides[0];
        self.read()[start..start + n].to_vec()
    }

    pub fn transpose(&self) -> Self {
        let mut new_shape = self.shape.clone();
        new_shape.reverse();
        let mut new_strides = self.strides.clone();
        new_strides.reverse();

        Self {
            data: Arc::clone(&self.data),
            shape: new_shape,
            strides: new_strides
        }
    }

    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.shape.len(), 2, "self must be a 2D tensor.");
        assert_eq!(other.shape.len(), 2, "other must be a 2D tensor.");
        assert_eq!(self.shape[1], other.shape[0], "self columns must equal other rows");

        let k = self.shape[1];
        let n = other.shape[1];

        let c = Tensor::zeros(vec![self.shape[0], n]);

        let a_data = self.read();
        let b_data = other.read();

        {
            let mut c_data_guard = c.write();
            let c_slice: &mut [f32] = &mut c_data_guard;

            c_slice.par_chunks_mut(n).enumerate().for_each(|(m_idx, c_row)| {
                for k_idx in 0..k {
                    let a_val = a_data[m_idx * self.strides[0] + k_idx * self.strides[1]];
                    for n_idx in 0..n {
                        let b_val = b_data[k_idx * other.strides[0] + n_idx * other.strides[1]];
                        c_row[n_idx] += a_val * b_val;
                    }
                }
            });
        }

        c
    }

    // column sums of a contiguous 2D tensor, shape [1, n]
    pub fn sum_rows(&self) -> Tensor {
        assert_eq!(self.shape.len(), 2, "sum_rows only works for 2D tensors");

        let n = self.shape[1];
        let partial_sum = self.read().par_chunks(n.max(1)).map(|row_slice| {
            row_slice.to_vec()
        }).reduce(
            || vec![0.0; n],
            |mut acc, row| {
                for (a, r) in acc.iter_mut().zip(row) {
                    *a += r;
                }
                acc
            }
        );

        Tensor::from_vec(partial_sum, vec![1, n])
    }

    // per-row maximum of a contiguous 2D tensor
    pub fn max_per_row(&self) -> Vec<f32> {
        assert_eq!(self.shape.len(), 2, "max_per_row only works for 2D tensors");
        self.read()
            .chunks(self.shape[1].max(1))
            .map(|row| row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b)))
            .collect()
    }

    pub fn map<F>(&self, f: F) -> Tensor
    where F: Fn(f32) -> f32 + Sync + Send {
        let new_data: Vec<f32> = self.read().par_iter().map(|&x| f(x)).collect();
        Tensor::from_vec(new_data, self.shape.clone())
    }

    // map through self allowing access to second tensor
    pub fn map2<F>(&self, other: &Tensor, f: F) -> Tensor
    where F: Fn(f32, f32) -> f32 + Sync + Send {
        assert_eq!(self.shape, other.shape, "tensors must have the same shape");

        let data1 = self.read();
        let data2 = other.read();
        let new_data: Vec<f32> = data1.par_iter().zip(data2.par_iter()).map(|(&x1, &x2)| f(x1, x2)).collect();
        Tensor::from_vec(new_data, self.shape.clone())
    }

    pub fn deep_clone(&self) -> Tensor {
        let data_clone = self.read().clone();
        Tensor::from_vec(data_clone, self.shape.clone())
    }

    fn calc_strides(shape: &[usize]) -> Vec<usize> {
        let mut strides: Vec<usize> = vec![1; shape.len()];
        for i in (0..strides.len().saturating_sub(1)).rev() {
            strides[i] = strides[i+1] * shape[i+1];
        }
        strides
    }
}

impl Clone for Tensor {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            shape: self.shape.clone(),
            strides: self.strides.clone()
        }
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && *self.read() == *other.read()
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
         .field("shape", &self.shape)
         .field("data", &*self.read())
         .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct SerializableTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Serialize for Tensor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        // transposed views are written out in their own row-major order
        let data = if self.strides == Tensor::calc_strides(&self.shape) {
            self.read().clone()
        } else {
            let (m, n) = (self.shape[0], self.shape[1]);
            let source = self.read();
            (0..m).flat_map(|i| (0..n).map(move |j| (i, j)))
                .map(|(i, j)| source[i * self.strides[0] + j * self.strides[1]])
                .collect()
        };
        SerializableTensor { shape: self.shape.clone(), data }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tensor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        let s_tensor = SerializableTensor::deserialize(deserializer)?;
        if s_tensor.data.len() != s_tensor.shape.iter().product::<usize>() {
            return Err(serde::de::Error::custom("tensor data does not match its shape"));
        }
        Ok(Tensor::from_vec(s_tensor.data, s_tensor.shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_vec_approx_eq(a: &[f32], b: &[f32]) {
        let tolerance = 1e-4;
        assert_eq!(a.len(), b.len(), "vectors have different lengths");
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!((x - y).abs() < tolerance, "mismatch at index {}: {} vs {}", i, x, y);
        }
    }

    fn reference_matmul(a: &Tensor, b: &Tensor) -> Vec<f32> {
        let (m, k, n) = (a.shape[0], a.shape[1], b.shape[1]);
        let mut result = vec![0.0; m * n];
        let a_data = a.read();
        let b_data = b.read();

        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0;
                for l in 0..k {
                    sum += a_data[i * a.strides[0] + l * a.strides[1]] * b_data[l * b.strides[0] + j * b.strides[1]];
                }
                result[i * n + j] = sum;
            }
        }
        result
    }

    #[test]
    fn test_random_is_seeded() {
        let a = Tensor::random(vec![3, 4], 0.5, &mut StdRng::seed_from_u64(8));
        let b = Tensor::random(vec![3, 4], 0.5, &mut StdRng::seed_from_u64(8));
        assert_eq!(a.read().len(), 12);
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_rows() {
        let t = Tensor::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        assert_eq!(t.shape, vec![3, 2]);
        assert_eq!(t.row(1), vec![3.0, 4.0]);
    }

    #[test]
    #[should_panic]
    fn test_from_rows_ragged() {
        Tensor::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
    }

    #[test]
    fn test_strides() {
        assert_eq!(Tensor::calc_strides(&[1, 2, 3, 4]), vec![24, 12, 4, 1]);
        assert!(Tensor::calc_strides(&[]).is_empty());
    }

    #[test]
    fn test_matmul_simple() {
        // [[1, 2, 3], [4, 5, 6]] @ [[7, 8], [9, 10], [11, 12]]
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let b = Tensor::from_vec(vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0], vec![3, 2]);

        let c = a.matmul(&b);

        assert_eq!(c.shape, vec![2, 2]);
        assert_eq!(*c.read(), vec![58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_matmul_transpose_against_reference() {
        let mut rng = StdRng::seed_from_u64(21);
        let a = Tensor::random(vec![20, 30], 1.0, &mut rng);
        let b = a.transpose();

        let result_fast = a.matmul(&b);

        assert_eq!(result_fast.shape, vec![20, 20]);
        assert_vec_approx_eq(&result_fast.read(), &reference_matmul(&a, &b));
    }

    #[test]
    fn test_sum_rows() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let s = t.sum_rows();
        assert_eq!(s.shape, vec![1, 3]);
        assert_vec_approx_eq(&s.read(), &[5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_max_per_row() {
        let t = Tensor::from_vec(vec![1.0, -2.0, 3.0, -4.0, -5.0, -6.0], vec![2, 3]);
        assert_eq!(t.max_per_row(), vec![3.0, -4.0]);
    }

    #[test]
    fn test_map2_simple_add() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], vec![1, 3]);
        let b = Tensor::from_vec(vec![10.0, 20.0, 30.0], vec![1, 3]);
        assert_vec_approx_eq(&a.map2(&b, |x, y| x + y).read(), &[11.0, 22.0, 33.0]);
    }

    #[test]
    fn test_deep_clone_detaches() {
        let a = Tensor::from_vec(vec![1.0, 2.0], vec![1, 2]);
        let b = a.deep_clone();
        b.write()[0] = 9.0;
        assert_eq!(a.read()[0], 1.0);
        assert!(!Arc::ptr_eq(&a.data, &b.data));
    }

    #[test]
    fn test_serialize_transposed_view() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let bytes = bincode::serialize(&a.transpose()).unwrap();
        let restored: Tensor = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.shape, vec![3, 2]);
        assert_eq!(*restored.read(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }
}
