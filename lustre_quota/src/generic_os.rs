//
// No-op implementation, Lustre clients only exist on Linux.
//
use std::os::unix::io::RawFd;

use crate::{IfQuotactl, LqError};

pub const LL_IOC_QUOTACTL: u64 = 0xc0b066a2;

pub(crate) fn quotactl(_fd: RawFd, _req: &mut IfQuotactl) -> Result<(), LqError> {
    Err(LqError::Unsupported)
}
