pub mod fasta;
pub mod newick;
pub mod sequence;

pub use sequence::Sequence;
