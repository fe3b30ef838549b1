pub type RcT<T> = std::rc::Rc<T>;


fn padded(dims: &[usize], rank: usize) -> Vec<usize> {
  let mut out = vec![1; rank - dims.len()];
  out.extend_from_slice(dims);
  out
}


/// Result shape of broadcasting two shapes against each other,
/// aligned from the trailing dimension.

pub fn broadcast_dims(lhs: &[usize], rhs: &[usize]) -> Option<Vec<usize>> {
  let rank = lhs.len().max(rhs.len());
  padded(lhs, rank).into_iter()
    .zip(padded(rhs, rank))
    .map(|(l, r)| {
      if l == r { Some(l) }
      else if l == 1 { Some(r) }
      else if r == 1 { Some(l) }
      else { None }
    })
    .collect()
}


pub fn contiguous_strides(dims: &[usize]) -> Vec<usize> {
  let mut strides = vec![0; dims.len()];
  let mut acc = 1;
  for i in (0..dims.len()).rev() {
    strides[i] = acc;
    acc *= dims[i];
  }
  strides
}


/// Strides for reading a tensor of shape `dims` as if it had shape `target`.
/// Broadcasted dimensions get a stride of zero.

pub fn broadcast_strides(dims: &[usize], target: &[usize]) -> Vec<usize> {
  let dims = padded(dims, target.len());
  contiguous_strides(&dims).into_iter()
    .zip(dims.iter().zip(target))
    .map(|(stride, (&d, &t))| if d == 1 && t != 1 { 0 } else { stride } )
    .collect()
}


/// Map a flat index into `target` onto storage described by `strides`.

#[inline]
pub fn strided_offset(mut index: usize, target: &[usize], strides: &[usize]) -> usize {
  let mut offset = 0;
  for d in (0..target.len()).rev() {
    let dim = target[d];
    offset += (index % dim) * strides[d];
    index /= dim;
  }
  offset
}
