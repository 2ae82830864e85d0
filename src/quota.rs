//
// Fetch the quota of every collected user, with root privilege held only
// for the duration of the loop.
//
use std::path::Path;

use lustre_quota::{QuotaCtl, QuotaDir};

use crate::error::LgqError;
use crate::members::{Lookup, MemberSet};
use crate::suid::{Identity, UidOps};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchSummary {
    pub found:  usize,
    pub failed: usize,
}

/// Open `mount` as the caller, then fetch all quotas as root.
pub fn fetch_quotas<S: UidOps>(
    mount: &Path,
    members: &mut MemberSet,
    ident: &Identity<S>,
) -> Result<FetchSummary, LgqError>
{
    let dir = QuotaDir::open(mount).map_err(|e| {
        LgqError::MountOpen {
            path:   mount.to_path_buf(),
            source: e,
        }
    })?;
    let summary = fetch_with(&dir, members, ident)?;
    // privilege is already dropped here, close the mount after it.
    drop(dir);
    Ok(summary)
}

/// The privileged loop. A failed lookup is recorded in its query and
/// does not stop the others.
pub fn fetch_with<Q: QuotaCtl, S: UidOps>(
    ctl: &Q,
    members: &mut MemberSet,
    ident: &Identity<S>,
) -> Result<FetchSummary, LgqError>
{
    let _privileged = ident.raise()?;

    let mut summary = FetchSummary::default();
    for query in members.iter_mut() {
        let result = ctl.get_quota(query.qc_type(), query.qc_id());
        query.record(result);
        match query.lookup() {
            Lookup::Found(_) => summary.found += 1,
            Lookup::Failed(e) => {
                debug!("fetch: uid {}: {}", query.qc_id(), e);
                summary.failed += 1;
            },
            Lookup::Pending => {},
        }
    }
    Ok(summary)
}
