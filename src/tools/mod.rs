pub mod blastall;
pub mod traits;

pub use blastall::ProcessLauncher;
pub use traits::Launcher;
