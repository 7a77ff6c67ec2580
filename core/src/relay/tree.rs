//! Header commitment sibling path.
//!
//! The header circuit recomputes the block hash from the time and app hash
//! leaves. It needs the six subtree roots that are siblings on the paths
//! from those two leaves to the root:
//!
//! ```text
//!                           root
//!              ┌─────────────┴─────────────┐
//!        ┌─────┴─────┐               ┌─────┴─────┐
//!     ┌──┴──┐      idx4*          ┌──┴──┐      idx6*
//!   idx7*  ┌┴──┐   (4..8)       idx11*  ┌┴──┐   (12,13)
//!   (0,1) idx17* time           (8,9)  app  idx26*
//!          (2)   (3)                   (10)  (11)
//! ```
//!
//! Carried in the order `[idx4, idx6, idx7, idx11, idx17, idx26]`.

use crate::error::Result;
use crate::header::{
    APP_HASH_LEAF, HEADER_FIELDS, Hash, Header, TIME_LEAF, inner_hash, merkle_root,
};

pub const SIMPLE_TREE_PROOF_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleTreeProof(pub [Hash; SIMPLE_TREE_PROOF_LEN]);

impl SimpleTreeProof {
    pub fn build(header: &Header) -> Result<Self> {
        Ok(Self::from_leaves(&header.leaves()?))
    }

    pub fn from_leaves(leaves: &[Hash; HEADER_FIELDS]) -> Self {
        let idx7 = inner_hash(&leaves[0], &leaves[1]);
        let idx17 = leaves[2];
        let idx6 = inner_hash(&leaves[12], &leaves[13]);
        let idx26 = leaves[11];
        let idx11 = inner_hash(&leaves[8], &leaves[9]);
        let idx4 = inner_hash(
            &inner_hash(&leaves[4], &leaves[5]),
            &inner_hash(&leaves[6], &leaves[7]),
        );
        Self([idx4, idx6, idx7, idx11, idx17, idx26])
    }

    /// Recompute the block hash from the proof and the two leaves the circuit supplies
    pub fn root(&self, time_leaf: &Hash, app_hash_leaf: &Hash) -> Hash {
        let [idx4, idx6, idx7, idx11, idx17, idx26] = &self.0;
        let left = inner_hash(&inner_hash(idx7, &inner_hash(idx17, time_leaf)), idx4);
        let right = inner_hash(&inner_hash(idx11, &inner_hash(app_hash_leaf, idx26)), idx6);
        inner_hash(&left, &right)
    }

    /// Root check against a full header
    pub fn verify(&self, header: &Header) -> Result<bool> {
        let leaves = header.leaves()?;
        Ok(self.root(&leaves[TIME_LEAF], &leaves[APP_HASH_LEAF]) == merkle_root(&leaves))
    }

    pub fn to_vec(&self) -> Vec<Vec<u8>> {
        self.0.iter().map(|h| h.to_vec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::header::tests::sample_header;
    use crate::header::leaf_hash;

    #[test]
    fn test_deterministic() {
        let header = sample_header(42);
        let a = SimpleTreeProof::build(&header).unwrap();
        let b = SimpleTreeProof::build(&header.clone()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_vec().len(), SIMPLE_TREE_PROOF_LEN);
        assert!(a.to_vec().iter().all(|h| h.len() == 32));
    }

    #[test]
    fn test_root_matches_block_hash() {
        for height in [1u64, 100, 101, 150] {
            let header = sample_header(height);
            let leaves = header.leaves().unwrap();
            let proof = SimpleTreeProof::build(&header).unwrap();
            assert_eq!(
                proof.root(&leaves[TIME_LEAF], &leaves[APP_HASH_LEAF]),
                header.hash().unwrap()
            );
            assert!(proof.verify(&header).unwrap());
        }
    }

    #[test]
    fn test_passthrough_leaves() {
        let header = sample_header(9);
        let leaves = header.leaves().unwrap();
        let proof = SimpleTreeProof::build(&header).unwrap();
        assert_eq!(proof.0[4], leaves[2]);
        assert_eq!(proof.0[5], leaves[11]);
        assert_eq!(proof.0[2], inner_hash(&leaves[0], &leaves[1]));
    }

    #[test]
    fn test_proof_ignores_time_and_app_hash() {
        let header = sample_header(9);
        let mut other = header.clone();
        other.app_hash = vec![0xee; 32];
        other.time = other.time + chrono::Duration::seconds(5);
        assert_eq!(
            SimpleTreeProof::build(&header).unwrap(),
            SimpleTreeProof::build(&other).unwrap()
        );
    }

    #[test]
    fn test_wrong_app_hash_leaf_changes_root() {
        let header = sample_header(9);
        let leaves = header.leaves().unwrap();
        let proof = SimpleTreeProof::build(&header).unwrap();
        assert_ne!(
            proof.root(&leaves[TIME_LEAF], &leaf_hash(b"forged")),
            header.hash().unwrap()
        );
    }

    #[test]
    fn test_missing_validators_hash() {
        let mut header = sample_header(9);
        header.validators_hash.clear();
        assert!(matches!(
            SimpleTreeProof::build(&header),
            Err(RelayError::MalformedHeader(_))
        ));
    }
}
