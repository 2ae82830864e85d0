use std::io;
use std::path::PathBuf;

/// Everything that ends a run without output.
#[derive(Debug, thiserror::Error)]
pub enum LgqError {
    #[error("cannot read process uids: {0}")]
    IdentityQuery(#[source] io::Error),
    #[error("uid transition failed: {0}")]
    PrivilegeTransition(#[source] io::Error),
    #[error("cannot read process groups: {0}")]
    GroupQuery(#[source] io::Error),
    #[error("process is not a member of any group")]
    NoGroups,
    #[error("no users found in the caller's groups")]
    NoMembers,
    #[error("cannot open {path:?}: {source}")]
    MountOpen {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("writing output: {0}")]
    Output(#[from] io::Error),
}
