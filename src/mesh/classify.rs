//! Fixed/free vertex classification.

use crate::error::{ArapError, Result};

/// Role of a vertex in a deformation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexRole {
    /// Pinned to a user-supplied target position.
    Fixed,
    /// Solved for.
    Free,
}

/// Role of a vertex plus its row in that role's compact index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexInfo {
    /// Fixed or free.
    pub role: VertexRole,
    /// Row in the fixed-target table (fixed) or in the reduced system (free).
    pub pos: usize,
}

/// Partition of the mesh vertices into fixed and free sets.
///
/// Fixed vertices keep the order in which they were supplied, so row `k` of
/// the target table belongs to `fixed()[k]`. Free vertices are numbered in
/// ascending vertex order.
#[derive(Debug, Clone)]
pub struct Classification {
    info: Vec<VertexInfo>,
    fixed: Vec<usize>,
    free: Vec<usize>,
}

impl Classification {
    /// Classify `num_vertices` vertices given the list of fixed ones.
    ///
    /// # Errors
    ///
    /// Returns an error if a fixed index is out of range or listed twice.
    /// An empty free set is allowed here; it is rejected when the system
    /// matrix is assembled.
    pub fn new(num_vertices: usize, fixed: &[usize]) -> Result<Self> {
        let mut info = vec![
            VertexInfo {
                role: VertexRole::Free,
                pos: usize::MAX,
            };
            num_vertices
        ];

        for (k, &v) in fixed.iter().enumerate() {
            if v >= num_vertices {
                return Err(ArapError::InvalidFixedVertex {
                    vertex: v,
                    num_vertices,
                });
            }
            if info[v].role == VertexRole::Fixed {
                return Err(ArapError::DuplicateFixedVertex { vertex: v });
            }
            info[v] = VertexInfo {
                role: VertexRole::Fixed,
                pos: k,
            };
        }

        let mut free = Vec::with_capacity(num_vertices - fixed.len());
        for (v, vi) in info.iter_mut().enumerate() {
            if vi.role == VertexRole::Free {
                vi.pos = free.len();
                free.push(v);
            }
        }

        Ok(Self {
            info,
            fixed: fixed.to_vec(),
            free,
        })
    }

    /// Number of classified vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.info.len()
    }

    /// Fixed vertex indices, in target-table order.
    #[inline]
    pub fn fixed(&self) -> &[usize] {
        &self.fixed
    }

    /// Free vertex indices, in reduced-system order.
    #[inline]
    pub fn free(&self) -> &[usize] {
        &self.free
    }

    /// Role and compact position of vertex `v`.
    #[inline]
    pub fn info(&self, v: usize) -> VertexInfo {
        self.info[v]
    }

    /// Whether vertex `v` is fixed.
    #[inline]
    pub fn is_fixed(&self, v: usize) -> bool {
        self.info[v].role == VertexRole::Fixed
    }

    /// Reduced-system row of `v`, or `None` if it is fixed.
    #[inline]
    pub fn free_pos(&self, v: usize) -> Option<usize> {
        let vi = self.info[v];
        (vi.role == VertexRole::Free).then_some(vi.pos)
    }

    /// Target-table row of `v`, or `None` if it is free.
    #[inline]
    pub fn fixed_pos(&self, v: usize) -> Option<usize> {
        let vi = self.info[v];
        (vi.role == VertexRole::Fixed).then_some(vi.pos)
    }
}
