//
// Linux specific ioctl for Lustre quota.
//
use std::io;
use std::mem::size_of;
use std::os::unix::io::RawFd;

use crate::{IfQuotactl, LqError};

// asm-generic ioctl encoding (x86, arm, riscv).
const fn iowr(ty: u8, nr: u8, size: usize) -> u64 {
    (3u64 << 30) | ((size as u64) << 16) | ((ty as u64) << 8) | nr as u64
}

/// `_IOWR('f', 162, struct if_quotactl)`
pub const LL_IOC_QUOTACTL: u64 = iowr(b'f', 162, size_of::<IfQuotactl>());

pub(crate) fn quotactl(fd: RawFd, req: &mut IfQuotactl) -> Result<(), LqError> {
    let rc = unsafe { libc::ioctl(fd, LL_IOC_QUOTACTL as _, req as *mut IfQuotactl) };
    if rc < 0 {
        let e = io::Error::last_os_error();
        debug!("quotactl: type {} id {}: {}", req.qc_type, req.qc_id, e);
        return Err(LqError::from_os(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ioctl_number() {
        assert_eq!(LL_IOC_QUOTACTL, 0xc0b066a2);
    }
}
