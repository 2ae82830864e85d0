//! Query Lustre user and group quota through the `LL_IOC_QUOTACTL` ioctl.
//!
//! The ioctl is issued on a directory handle of the Lustre mount. The kernel
//! client only honours queries for ids other than the caller's own when
//! the effective uid is root, so programs using this crate for other users
//! usually run setuid and bracket the calls with a uid switch.
//!
//! ```no_run
//! use lustre_quota::{QuotaCtl, QuotaDir, USRQUOTA};
//!
//! let dir = QuotaDir::open("/lustre").unwrap();
//! let dqblk = dir.get_quota(USRQUOTA, 1001).unwrap();
//! println!("{} bytes used", dqblk.dqb_curspace);
//! ```
#[macro_use]
extern crate log;

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use crate::linux as os;

#[cfg(not(target_os = "linux"))]
mod generic_os;
#[cfg(not(target_os = "linux"))]
use crate::generic_os as os;

pub use crate::os::LL_IOC_QUOTACTL;

/// Quota type: per user.
pub const USRQUOTA: u32 = 0;
/// Quota type: per group.
pub const GRPQUOTA: u32 = 1;

/// `qc_cmd` value for "get current usage and limits".
pub const LUSTRE_Q_GETQUOTA: u32 = 0x800007;

/// `struct obd_dqinfo`: grace periods.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ObdDqinfo {
    pub dqi_bgrace: u64,
    pub dqi_igrace: u64,
    pub dqi_flags:  u32,
    pub dqi_valid:  u32,
}

/// `struct obd_dqblk`: usage and limits of one id.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ObdDqblk {
    pub dqb_bhardlimit: u64,
    pub dqb_bsoftlimit: u64,
    pub dqb_curspace:   u64,
    pub dqb_ihardlimit: u64,
    pub dqb_isoftlimit: u64,
    pub dqb_curinodes:  u64,
    pub dqb_btime:      u64,
    pub dqb_itime:      u64,
    pub dqb_valid:      u32,
    pub dqb_padding:    u32,
}

/// `struct if_quotactl`, the argument of `LL_IOC_QUOTACTL`.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct IfQuotactl {
    pub qc_cmd:    u32,
    pub qc_type:   u32,
    pub qc_id:     u32,
    pub qc_stat:   u32,
    pub qc_valid:  u32,
    pub qc_idx:    u32,
    pub qc_dqinfo: ObdDqinfo,
    pub qc_dqblk:  ObdDqblk,
    pub obd_type:  [u8; 16],
    pub obd_uuid:  [u8; 40],
}

impl IfQuotactl {
    /// A zeroed `LUSTRE_Q_GETQUOTA` request for `qc_id`.
    pub fn get_quota(qc_type: u32, qc_id: u32) -> IfQuotactl {
        IfQuotactl {
            qc_cmd:    LUSTRE_Q_GETQUOTA,
            qc_type:   qc_type,
            qc_id:     qc_id,
            qc_stat:   0,
            qc_valid:  0,
            qc_idx:    0,
            qc_dqinfo: ObdDqinfo::default(),
            qc_dqblk:  ObdDqblk::default(),
            obd_type:  [0; 16],
            obd_uuid:  [0; 40],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LqError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("no quota record")]
    NoQuota,
    #[error("quota control not supported here")]
    Unsupported,
    #[error(transparent)]
    IoError(#[from] io::Error),
}

impl LqError {
    /// Map the errno of a failed quotactl call.
    pub fn from_os(e: io::Error) -> LqError {
        match e.raw_os_error() {
            Some(libc::EPERM) | Some(libc::EACCES) => LqError::PermissionDenied,
            Some(libc::ENOENT) | Some(libc::ESRCH) => LqError::NoQuota,
            Some(libc::ENOTTY) | Some(libc::EOPNOTSUPP) | Some(libc::ENOSYS) => LqError::Unsupported,
            _ => LqError::IoError(e),
        }
    }
}

fn to_num(e: &LqError) -> u32 {
    match e {
        &LqError::PermissionDenied => 1,
        &LqError::NoQuota => 2,
        &LqError::Unsupported => 3,
        &LqError::IoError(_) => 4,
    }
}

impl PartialEq for LqError {
    fn eq(&self, other: &Self) -> bool {
        match self {
            &LqError::IoError(ref e) => {
                if let &LqError::IoError(ref o) = other {
                    e.kind() == o.kind()
                } else {
                    false
                }
            },
            e => to_num(e) == to_num(other),
        }
    }
}

/// Something that can run a quotactl request.
pub trait QuotaCtl {
    /// Issue `req` and let the filesystem fill in the answer.
    fn quotactl(&self, req: &mut IfQuotactl) -> Result<(), LqError>;

    /// Get usage and limits for one user or group.
    fn get_quota(&self, qc_type: u32, qc_id: u32) -> Result<ObdDqblk, LqError> {
        let mut req = IfQuotactl::get_quota(qc_type, qc_id);
        self.quotactl(&mut req)?;
        Ok(req.qc_dqblk)
    }
}

/// An open directory handle on a Lustre mount.
#[derive(Debug)]
pub struct QuotaDir {
    dir:  File,
    path: PathBuf,
}

impl QuotaDir {
    /// Open the mount point. Fails if it does not exist, is not a
    /// directory, or is not accessible with the current effective uid.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<QuotaDir> {
        let path = path.as_ref();
        let dir = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECTORY | libc::O_NONBLOCK)
            .open(path)?;
        debug!("QuotaDir::open: {:?} fd {}", path, dir.as_raw_fd());
        Ok(QuotaDir {
            dir:  dir,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QuotaCtl for QuotaDir {
    fn quotactl(&self, req: &mut IfQuotactl) -> Result<(), LqError> {
        os::quotactl(self.dir.as_raw_fd(), req)
    }
}
