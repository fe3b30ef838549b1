use std::rc::Rc;
use std::cell::{ Ref, RefCell, RefMut };

use rand::Rng;

mod lops;

use crate::{
  internal::*,
  variable::Variable,
  scalar::{ Inner, Numeric, Real },
};


/// Dense, row-major multidimensional array.
///
/// Clones share their storage, which lets optimizers update
/// parameters in place through any handle to them.
///
/// [Real] tensors can be wrapped in a [Variable] by calling
/// [tracked](Tensor::tracked) or [trained](Tensor::trained).

#[derive(Debug, Clone)]
pub struct Tensor<T: Inner> {
  dims: Vec<usize>,
  data: Rc<RefCell<Vec<T>>>,
}

impl<T: Inner> PartialEq for Tensor<T> {
  fn eq(&self, rhs: &Self) -> bool {
    self.dims == rhs.dims && *self.data.borrow() == *rhs.data.borrow()
  }
}

impl<T: Inner> Tensor<T> {
  pub fn new(shape: &[usize], data: Vec<T>) -> Self {
    assert_eq!(shape.iter().product::<usize>(), data.len(),
      "Shape {:?} doesn't match data length {}", shape, data.len());
    Self { dims: shape.to_vec(), data: Rc::new(RefCell::new(data)) }
  }

  pub fn scalar(item: T) -> Self {
    Self::new(&[], vec![item])
  }

  pub fn vec(vec: &[T]) -> Self {
    Self::new(&[vec.len()], vec.to_vec())
  }

  pub fn fill(shape: &[usize], filler: T) -> Self {
    Self::new(shape, vec![filler; shape.iter().product()])
  }

  /// Stack equally sized rows into a `[rows, width]` matrix.
  ///
  /// `width` is given explicitly so that zero rows still produce a
  /// well-formed `[0, width]` tensor.

  pub fn rows(rows: &[Vec<T>], width: usize) -> Self {
    let mut data = Vec::with_capacity(rows.len() * width);
    for row in rows {
      assert_eq!(row.len(), width, "Row of length {} in matrix of width {}", row.len(), width);
      data.extend_from_slice(row);
    }
    Self::new(&[rows.len(), width], data)
  }

  pub fn shape(&self) -> &[usize] {
    &self.dims
  }

  pub fn dim(&self, idx: usize) -> usize {
    self.dims[idx]
  }

  pub fn size(&self) -> usize {
    self.dims.iter().product()
  }

  pub fn rank(&self) -> usize {
    self.dims.len()
  }

  pub fn raw(&self) -> Ref<Vec<T>> {
    self.data.borrow()
  }

  pub fn raw_mut(&self) -> RefMut<Vec<T>> {
    self.data.borrow_mut()
  }

  pub fn to_vec(&self) -> Vec<T> {
    self.data.borrow().clone()
  }

  pub fn item(&self) -> T {
    assert!(self.size() == 1, "Can't extract item from tensor of shape {:?}", self.dims);
    self.data.borrow()[0]
  }

  /// Copy of row `idx` of a matrix.

  pub fn row(&self, idx: usize) -> Self {
    assert_eq!(self.rank(), 2, "Can only take rows of a matrix");
    let width = self.dims[1];
    let data = self.data.borrow()[idx * width..(idx + 1) * width].to_vec();
    Self::new(&[width], data)
  }

  /// Deep copy with independent storage.

  pub fn detach(&self) -> Self {
    Self::new(&self.dims, self.to_vec())
  }

  pub fn shared_with(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.data, &other.data)
  }

  /// Overwrite this tensor's storage with the contents of `other`.

  pub fn assign(&self, other: &Self) {
    assert_eq!(self.dims, other.dims,
      "Could not assign {:?} tensor to {:?} tensor", other.dims, self.dims);
    if self.shared_with(other) { return }
    self.data.borrow_mut().copy_from_slice(&other.data.borrow());
  }

  pub fn refill(&self, filler: T) {
    self.data.borrow_mut().iter_mut().for_each(|a| *a = filler );
  }

  /// Combine `other` into this tensor element-wise, in place.

  pub fn op_assign(&self, other: &Self, cb: impl Fn(&mut T, T)) {
    assert_eq!(self.dims, other.dims,
      "Could not combine {:?} tensor into {:?} tensor", other.dims, self.dims);
    let other = if self.shared_with(other) { other.detach() } else { other.clone() };
    let mut data = self.data.borrow_mut();
    for (a, &b) in data.iter_mut().zip(other.data.borrow().iter()) {
      cb(a, b);
    }
  }

  pub fn vectorize<O: Inner>(&self, cb: impl FnMut(T) -> O) -> Tensor<O> {
    let data = self.data.borrow().iter().copied().map(cb).collect();
    Tensor::new(&self.dims, data)
  }

  /// Combine two tensors element-wise, broadcasting their shapes
  /// against each other from the trailing dimension.

  pub fn zip<O: Inner>(&self, rhs: &Self, cb: impl Fn(T, T) -> O) -> Tensor<O> {
    if self.dims == rhs.dims {
      let data = self.data.borrow().iter()
        .zip(rhs.data.borrow().iter())
        .map(|(&a, &b)| cb(a, b) )
        .collect();
      return Tensor::new(&self.dims, data)
    }
    let dims = broadcast_dims(&self.dims, &rhs.dims)
      .unwrap_or_else(|| panic!("Cannot broadcast {:?} with {:?}", self.dims, rhs.dims));
    let strides_l = broadcast_strides(&self.dims, &dims);
    let strides_r = broadcast_strides(&rhs.dims, &dims);
    let data_l = self.data.borrow();
    let data_r = rhs.data.borrow();
    let size = dims.iter().product();
    let data = (0..size)
      .map(|i| cb(
        data_l[strided_offset(i, &dims, &strides_l)],
        data_r[strided_offset(i, &dims, &strides_r)],
      ))
      .collect();
    Tensor::new(&dims, data)
  }

  /// Number of elements satisfying `predicate`.

  pub fn count(&self, predicate: impl Fn(T) -> bool) -> usize {
    self.data.borrow().iter().filter(|&&a| predicate(a) ).count()
  }

  pub fn transpose(&self) -> Self {
    assert_eq!(self.rank(), 2, "Can only transpose a matrix");
    let (rows, cols) = (self.dims[0], self.dims[1]);
    let data = self.data.borrow();
    let mut out = Vec::with_capacity(data.len());
    for j in 0..cols {
      for i in 0..rows {
        out.push(data[i * cols + j]);
      }
    }
    Self::new(&[cols, rows], out)
  }
}

impl<T: Numeric> Tensor<T> {
  pub fn zeros(shape: &[usize]) -> Self {
    Self::fill(shape, T::zero())
  }

  pub fn ones(shape: &[usize]) -> Self {
    Self::fill(shape, T::one())
  }

  pub fn sum(&self) -> T {
    self.data.borrow().iter().copied().sum()
  }

  /// Sum over broadcasted dimensions to recover a tensor of shape `dims`.
  /// This is the adjoint of broadcasting `dims` up to this tensor's shape.

  pub fn unbroadcast(&self, dims: &[usize]) -> Self {
    if self.dims == dims { return self.clone() }
    let strides = broadcast_strides(dims, &self.dims);
    let mut out = vec![T::zero(); dims.iter().product()];
    for (i, &value) in self.data.borrow().iter().enumerate() {
      out[strided_offset(i, &self.dims, &strides)] += value;
    }
    Self::new(dims, out)
  }
}

impl<T: Real> Tensor<T> {
  /// Uniformly distributed values in `[low, high)`.

  pub fn uniform(shape: &[usize], low: T, high: T, rng: &mut impl Rng) -> Self {
    let len = shape.iter().product();
    let data = (0..len).map(|_| rng.gen_range(low, high) ).collect();
    Self::new(shape, data)
  }

  pub fn matmul(&self, rhs: &Self) -> Self {
    assert!(self.rank() == 2 && rhs.rank() == 2,
      "Matrix product needs two matrices, got {:?} and {:?}", self.dims, rhs.dims);
    let (m, k, n) = (self.dims[0], self.dims[1], rhs.dims[1]);
    assert_eq!(k, rhs.dims[0],
      "Cannot multiply {:?} with {:?} matrix", self.dims, rhs.dims);
    let mut out = vec![T::zero(); m * n];
    T::gemm(m, k, n, &self.data.borrow(), &rhs.data.borrow(), &mut out);
    Self::new(&[m, n], out)
  }

  pub fn powf(&self, exp: T) -> Self {
    self.vectorize(|a| a.powf(exp) )
  }

  pub fn sqrt(&self) -> Self {
    self.vectorize(|a| a.sqrt() )
  }

  pub fn all_finite(&self) -> bool {
    self.data.borrow().iter().all(|a| a.is_finite() )
  }

  pub fn trained(&self) -> Variable<T> {
    Variable::from_tensor(self.clone(), true)
  }

  pub fn tracked(&self) -> Variable<T> {
    Variable::from_tensor(self.clone(), false)
  }
}

impl<T: Inner> std::fmt::Display for Tensor<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Tensor{:?} ", self.dims)?;
    let data = self.data.borrow();
    if self.rank() == 2 && self.dims[1] > 0 {
      write!(f, "[\n")?;
      for row in data.chunks(self.dims[1]) {
        write!(f, "  {:?}\n", row)?;
      }
      write!(f, "]")
    } else {
      write!(f, "{:?}", *data)
    }
  }
}
