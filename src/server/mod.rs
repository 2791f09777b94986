pub mod git;
mod router;
pub mod validation;

pub use git::{CgiBridge, CgiError, CgiProcess, CgiRequest, GitError, GitHttpBackend};
pub use router::{AppState, create_router};
