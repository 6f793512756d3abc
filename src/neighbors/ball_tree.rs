use crate::data::dataset::RealNumber;
use crate::error::MlError;
use nalgebra::{DMatrix, DVector};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::ops::Range;

/// Ball tree for nearest-neighbour searches in a fixed-dimension space.
///
/// Construction reorders the stored points: every subtree owns a contiguous
/// row range sorted along the dimension with the widest spread in that range,
/// with the median row acting as the pivot. A search can then discard a whole
/// subtree once the distance to its pivot minus its radius cannot beat the
/// current candidates. Neighbour indices refer to the reordered points
/// returned by [`BallTree::data`].
#[derive(Clone, Debug)]
pub struct BallTree<T: RealNumber> {
    data: DMatrix<T>,
    labels: Option<DVector<T>>,
    root: BallNode<T>,
}

#[derive(Clone, Debug)]
enum BallNode<T: RealNumber> {
    Leaf {
        rows: Range<usize>,
    },
    Ball {
        pivot_row: usize,
        split_dim: usize,
        radius: T,
        left: Box<BallNode<T>>,
        right: Box<BallNode<T>>,
    },
}

#[derive(Clone, Copy, Debug)]
struct Neighbour<T: RealNumber> {
    distance: T,
    row: usize,
}

impl<T: RealNumber> PartialEq for Neighbour<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: RealNumber> Eq for Neighbour<T> {}

impl<T: RealNumber> PartialOrd for Neighbour<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: RealNumber> Ord for Neighbour<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.row.cmp(&other.row))
    }
}

impl<T: RealNumber> BallTree<T> {
    /// Builds a tree over `points`, one sample per row. Row ranges shorter
    /// than `min_split_size` are kept as flat leaves.
    pub fn new(points: DMatrix<T>, min_split_size: usize) -> Result<Self, MlError> {
        Self::with_optional_labels(points, None, min_split_size)
    }

    /// Builds a tree over labelled points. The labels are permuted together
    /// with the points, so `labels()[i]` stays attached to `data().row(i)`.
    pub fn with_labels(
        points: DMatrix<T>,
        labels: DVector<T>,
        min_split_size: usize,
    ) -> Result<Self, MlError> {
        if labels.len() != points.nrows() {
            return Err(MlError::invalid_input(
                "The number of labels must match the number of samples.",
            ));
        }
        Self::with_optional_labels(points, Some(labels), min_split_size)
    }

    fn with_optional_labels(
        mut points: DMatrix<T>,
        mut labels: Option<DVector<T>>,
        min_split_size: usize,
    ) -> Result<Self, MlError> {
        if min_split_size == 0 {
            return Err(MlError::invalid_input(
                "The minimum split size must be greater than 0.",
            ));
        }
        let rows = 0..points.nrows();
        let root = Self::build_node(&mut points, &mut labels, rows, min_split_size);
        Ok(Self {
            data: points,
            labels,
            root,
        })
    }

    /// The stored points in tree order.
    pub fn data(&self) -> &DMatrix<T> {
        &self.data
    }

    /// The stored labels in tree order, when the tree was built with labels.
    pub fn labels(&self) -> Option<&DVector<T>> {
        self.labels.as_ref()
    }

    /// Returns the indices of the up to `k` nearest stored points, ordered
    /// from the farthest of them to the nearest.
    pub fn find_k_nearest_neighbours(
        &self,
        x: &DVector<T>,
        k: usize,
    ) -> Result<Vec<usize>, MlError> {
        if x.len() != self.data.ncols() {
            return Err(MlError::DimensionMismatch {
                expected: self.data.ncols(),
                found: x.len(),
            });
        }
        let mut heap = BinaryHeap::new();
        if k > 0 {
            self.search(&self.root, x, k, &mut heap);
        }
        let mut neighbours = Vec::with_capacity(heap.len());
        while let Some(neighbour) = heap.pop() {
            neighbours.push(neighbour.row);
        }
        Ok(neighbours)
    }

    fn build_node(
        data: &mut DMatrix<T>,
        labels: &mut Option<DVector<T>>,
        rows: Range<usize>,
        min_split_size: usize,
    ) -> BallNode<T> {
        let len = rows.end - rows.start;
        if len < 2 || len < min_split_size {
            return BallNode::Leaf { rows };
        }

        let split_dim = Self::widest_dimension(data, &rows);
        Self::sort_range(data, labels, &rows, split_dim);

        let pivot_row = rows.start + len / 2;
        let mut radius = T::zero();
        for row in rows.clone() {
            let distance = Self::row_distance(data, pivot_row, row);
            if distance > radius {
                radius = distance;
            }
        }

        let left = Self::build_node(data, labels, rows.start..pivot_row, min_split_size);
        let right = Self::build_node(data, labels, pivot_row + 1..rows.end, min_split_size);
        BallNode::Ball {
            pivot_row,
            split_dim,
            radius,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn widest_dimension(data: &DMatrix<T>, rows: &Range<usize>) -> usize {
        let mut split_dim = 0;
        let mut best_spread = T::neg_infinity();
        for dim in 0..data.ncols() {
            let mut low = T::infinity();
            let mut high = T::neg_infinity();
            for row in rows.clone() {
                let value = data[(row, dim)];
                if value < low {
                    low = value;
                }
                if value > high {
                    high = value;
                }
            }
            let spread = high - low;
            if spread > best_spread {
                best_spread = spread;
                split_dim = dim;
            }
        }
        split_dim
    }

    fn sort_range(
        data: &mut DMatrix<T>,
        labels: &mut Option<DVector<T>>,
        rows: &Range<usize>,
        split_dim: usize,
    ) {
        let mut order: Vec<usize> = rows.clone().collect();
        order.sort_by(|&a, &b| {
            data[(a, split_dim)]
                .partial_cmp(&data[(b, split_dim)])
                .unwrap_or(Ordering::Equal)
        });

        let sorted_points: Vec<DVector<T>> =
            order.iter().map(|&row| data.row(row).transpose()).collect();
        for (offset, point) in sorted_points.iter().enumerate() {
            data.row_mut(rows.start + offset).copy_from(&point.transpose());
        }
        if let Some(labels) = labels.as_mut() {
            let sorted_labels: Vec<T> = order.iter().map(|&row| labels[row]).collect();
            for (offset, value) in sorted_labels.into_iter().enumerate() {
                labels[rows.start + offset] = value;
            }
        }
    }

    fn search(
        &self,
        node: &BallNode<T>,
        x: &DVector<T>,
        k: usize,
        heap: &mut BinaryHeap<Neighbour<T>>,
    ) {
        match node {
            BallNode::Leaf { rows } => {
                for row in rows.clone() {
                    Self::offer(heap, k, Self::point_distance(&self.data, x, row), row);
                }
            }
            BallNode::Ball {
                pivot_row,
                split_dim,
                radius,
                left,
                right,
            } => {
                let pivot_distance = Self::point_distance(&self.data, x, *pivot_row);
                if heap.len() == k {
                    if let Some(farthest) = heap.peek() {
                        // No point inside the ball can beat the current
                        // candidates.
                        if pivot_distance - *radius >= farthest.distance {
                            return;
                        }
                    }
                }
                Self::offer(heap, k, pivot_distance, *pivot_row);
                if x[*split_dim] <= self.data[(*pivot_row, *split_dim)] {
                    self.search(left, x, k, heap);
                    self.search(right, x, k, heap);
                } else {
                    self.search(right, x, k, heap);
                    self.search(left, x, k, heap);
                }
            }
        }
    }

    fn offer(heap: &mut BinaryHeap<Neighbour<T>>, k: usize, distance: T, row: usize) {
        if heap.len() < k {
            heap.push(Neighbour { distance, row });
        } else if let Some(farthest) = heap.peek() {
            if distance < farthest.distance {
                heap.pop();
                heap.push(Neighbour { distance, row });
            }
        }
    }

    fn point_distance(data: &DMatrix<T>, x: &DVector<T>, row: usize) -> T {
        let mut sum = T::zero();
        for j in 0..data.ncols() {
            let diff = x[j] - data[(row, j)];
            sum += diff * diff;
        }
        sum.sqrt()
    }

    fn row_distance(data: &DMatrix<T>, a: usize, b: usize) -> T {
        let mut sum = T::zero();
        for j in 0..data.ncols() {
            let diff = data[(a, j)] - data[(b, j)];
            sum += diff * diff;
        }
        sum.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn four_points() -> DMatrix<f64> {
        DMatrix::from_row_slice(4, 2, &[0.5, -1.5, 0.6, 1.5, 0.4, 0.0, 2.0, 4.0])
    }

    #[test]
    fn test_zero_min_split_size_rejected() {
        assert!(BallTree::new(DMatrix::<f64>::zeros(2, 2), 0).is_err());
    }

    #[test]
    fn test_label_count_mismatch_rejected() {
        let points = DMatrix::<f64>::zeros(3, 2);
        let labels = DVector::from_vec(vec![1.0, 2.0]);

        assert!(BallTree::with_labels(points, labels, 3).is_err());
    }

    #[test]
    fn test_empty_tree() {
        let tree = BallTree::new(DMatrix::<f64>::zeros(0, 2), 3).unwrap();

        assert_eq!(tree.data().nrows(), 0);
        assert_eq!(tree.data().ncols(), 2);
        let neighbours = tree
            .find_k_nearest_neighbours(&DVector::from_vec(vec![0.0, 0.0]), 5)
            .unwrap();
        assert!(neighbours.is_empty());
    }

    #[test]
    fn test_single_point() {
        let points = DMatrix::from_row_slice(1, 2, &[0.5, 0.5]);
        let tree = BallTree::new(points.clone(), 3).unwrap();

        assert_eq!(tree.data(), &points);
        let neighbours = tree
            .find_k_nearest_neighbours(&DVector::from_vec(vec![10.0, 10.0]), 1)
            .unwrap();
        assert_eq!(neighbours, vec![0]);
    }

    // Two points stay below the split size, so the data keeps its order.
    #[test]
    fn test_small_range_is_not_reordered() {
        let points = DMatrix::from_row_slice(2, 3, &[0.5, -1.5, 0.0, 0.5, 1.5, 0.0]);
        let tree = BallTree::new(points.clone(), 3).unwrap();

        assert_eq!(tree.data(), &points);
    }

    #[test]
    fn test_points_sorted_along_the_widest_dimension() {
        let points = DMatrix::from_row_slice(3, 2, &[0.5, -1.5, 0.6, 1.5, 0.4, 0.0]);
        let labels = DVector::from_vec(vec![10.0, 20.0, 30.0]);
        let tree = BallTree::with_labels(points, labels, 3).unwrap();

        let expected = DMatrix::from_row_slice(3, 2, &[0.5, -1.5, 0.4, 0.0, 0.6, 1.5]);
        assert_relative_eq!(tree.data(), &expected, epsilon = 1e-15);
        let expected_labels = DVector::from_vec(vec![10.0, 30.0, 20.0]);
        assert_eq!(tree.labels().unwrap(), &expected_labels);
    }

    #[test]
    fn test_find_zero_neighbours() {
        let tree = BallTree::new(four_points(), 3).unwrap();

        let neighbours = tree
            .find_k_nearest_neighbours(&DVector::from_vec(vec![0.49, -1.51]), 0)
            .unwrap();
        assert!(neighbours.is_empty());
    }

    #[test]
    fn test_find_one_neighbour() {
        let tree = BallTree::new(four_points(), 3).unwrap();

        let neighbours = tree
            .find_k_nearest_neighbours(&DVector::from_vec(vec![0.49, -1.51]), 1)
            .unwrap();
        assert_eq!(neighbours.len(), 1);
        let nearest = tree.data().row(neighbours[0]);
        assert_relative_eq!(nearest[0], 0.5, epsilon = 1e-15);
        assert_relative_eq!(nearest[1], -1.5, epsilon = 1e-15);
    }

    // Neighbours come back ordered from the farthest match to the nearest.
    #[test]
    fn test_find_two_neighbours() {
        let labels = DVector::from_vec(vec![10.0, 20.0, 30.0, 40.0]);
        let tree = BallTree::with_labels(four_points(), labels, 3).unwrap();

        let neighbours = tree
            .find_k_nearest_neighbours(&DVector::from_vec(vec![0.49, -1.51]), 2)
            .unwrap();
        assert_eq!(neighbours, vec![1, 0]);

        let labels = tree.labels().unwrap();
        assert_eq!(labels[neighbours[0]], 30.0);
        assert_eq!(labels[neighbours[1]], 10.0);
    }

    #[test]
    fn test_find_more_neighbours_than_points() {
        let tree = BallTree::new(four_points(), 3).unwrap();

        let mut neighbours = tree
            .find_k_nearest_neighbours(&DVector::from_vec(vec![0.49, -1.51]), 100)
            .unwrap();
        assert_eq!(neighbours.len(), 4);
        neighbours.sort_unstable();
        assert_eq!(neighbours, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let tree = BallTree::new(four_points(), 3).unwrap();

        let result = tree.find_k_nearest_neighbours(&DVector::from_vec(vec![1.0, 2.0, 3.0]), 1);
        assert!(matches!(
            result,
            Err(MlError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    // Labels must follow their points through every reordering.
    #[test]
    fn test_labels_stay_attached_to_their_points() {
        let points = DMatrix::from_fn(15, 3, |i, j| ((i * 7 + j * 13) % 17) as f64 * 0.25 - 2.0);
        let labels = DVector::from_fn(15, |i, _| points.row(i).sum());
        let tree = BallTree::with_labels(points, labels, 4).unwrap();

        for row in 0..tree.data().nrows() {
            assert_relative_eq!(
                tree.labels().unwrap()[row],
                tree.data().row(row).sum(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_search_agrees_with_direct_scan() {
        let points = DMatrix::from_fn(15, 3, |i, j| ((i * 7 + j * 13) % 17) as f64 * 0.25 - 2.0);
        let tree = BallTree::new(points, 4).unwrap();
        let x = tree.data().row(5).transpose() + DVector::from_vec(vec![0.001, 0.001, 0.001]);

        let neighbours = tree.find_k_nearest_neighbours(&x, 1).unwrap();
        assert_eq!(neighbours, vec![5]);

        let all = tree.find_k_nearest_neighbours(&x, 15).unwrap();
        let mut sorted = all.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..15).collect::<Vec<_>>());
        assert_eq!(*all.last().unwrap(), 5);
    }
}
