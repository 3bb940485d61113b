//! Vector access consumed by the graph engine.

use std::sync::Arc;

/// Supplies the raw cells of a document's vector.
///
/// The graph never copies vectors; it asks for them every time a distance is
/// computed. A returned slice must stay valid and unchanged for as long as the
/// document is present in the graph.
pub trait DocVectorAccess: Send + Sync {
    /// Vector for `docid`, or `None` if the accessor has nothing stored for it.
    fn get_vector(&self, docid: u32) -> Option<&[f32]>;
}

impl DocVectorAccess for Vec<Vec<f32>> {
    #[inline]
    fn get_vector(&self, docid: u32) -> Option<&[f32]> {
        self.get(docid as usize).map(Vec::as_slice)
    }
}

impl DocVectorAccess for [Vec<f32>] {
    #[inline]
    fn get_vector(&self, docid: u32) -> Option<&[f32]> {
        self.get(docid as usize).map(Vec::as_slice)
    }
}

impl<T: DocVectorAccess + ?Sized> DocVectorAccess for Arc<T> {
    #[inline]
    fn get_vector(&self, docid: u32) -> Option<&[f32]> {
        (**self).get_vector(docid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_access() {
        let vectors = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(vectors.get_vector(1), Some(&[3.0, 4.0][..]));
        assert_eq!(vectors.get_vector(2), None);
    }

    #[test]
    fn test_arc_access_delegates() {
        let vectors = Arc::new(vec![vec![0.5f32; 3]]);
        let access: Arc<dyn DocVectorAccess> = Arc::new(vectors);
        assert_eq!(access.get_vector(0).map(<[f32]>::len), Some(3));
    }
}
