//
// Switching between the caller's uid and the setuid uid.
//
// lgq starts with real uid = caller and effective = saved = root. The
// caller's uid is assumed right away with root parked in the saved slot,
// root is taken back only while the quota ioctls run, and after that the
// saved slot is cleared so root cannot be regained.
//
use std::io;

use libc::uid_t;

use crate::error::LgqError;

const UID_NONE: uid_t = 0xffffffff;

/// Real, effective and saved uid of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResUid {
    pub real:      uid_t,
    pub effective: uid_t,
    pub saved:     uid_t,
}

/// The uid system calls. `None` leaves that id unchanged.
pub trait UidOps {
    fn getresuid(&self) -> io::Result<ResUid>;
    fn setresuid(&self, real: Option<uid_t>, effective: Option<uid_t>, saved: Option<uid_t>) -> io::Result<()>;
}

impl<'a, T: UidOps + ?Sized> UidOps for &'a T {
    fn getresuid(&self) -> io::Result<ResUid> {
        (**self).getresuid()
    }

    fn setresuid(&self, real: Option<uid_t>, effective: Option<uid_t>, saved: Option<uid_t>) -> io::Result<()> {
        (**self).setresuid(real, effective, saved)
    }
}

/// The real thing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Libc;

impl UidOps for Libc {
    fn getresuid(&self) -> io::Result<ResUid> {
        let mut u = ResUid {
            real:      UID_NONE,
            effective: UID_NONE,
            saved:     UID_NONE,
        };
        match unsafe { libc::getresuid(&mut u.real, &mut u.effective, &mut u.saved) } {
            0 => Ok(u),
            _ => Err(io::Error::last_os_error()),
        }
    }

    fn setresuid(&self, real: Option<uid_t>, effective: Option<uid_t>, saved: Option<uid_t>) -> io::Result<()> {
        let real = real.unwrap_or(UID_NONE);
        let effective = effective.unwrap_or(UID_NONE);
        let saved = saved.unwrap_or(UID_NONE);
        match unsafe { libc::setresuid(real, effective, saved) } {
            0 => Ok(()),
            _ => Err(io::Error::last_os_error()),
        }
    }
}

/// The uids captured at startup, and the transitions between them.
#[derive(Debug)]
pub struct Identity<S: UidOps = Libc> {
    ops:  S,
    orig: ResUid,
}

impl<S: UidOps> Identity<S> {
    /// Read the current uids. Must be done before any transition.
    pub fn capture(ops: S) -> Result<Identity<S>, LgqError> {
        let orig = ops.getresuid().map_err(LgqError::IdentityQuery)?;
        debug!("capture: r:{} e:{} s:{}", orig.real, orig.effective, orig.saved);
        if orig.effective != 0 {
            warn!("effective uid is {}, lgq is not installed setuid root", orig.effective);
        }
        Ok(Identity { ops, orig })
    }

    /// The uids as they were at startup.
    pub fn original(&self) -> ResUid {
        self.orig
    }

    /// Run as the caller from now on, keeping the setuid uid in the
    /// saved slot so that `raise` can get it back.
    pub fn assume_caller(&self) -> Result<(), LgqError> {
        self.transition("assume_caller", None, Some(self.orig.real), Some(self.orig.effective))
            .map_err(LgqError::PrivilegeTransition)
    }

    /// Switch the effective uid back to the setuid uid. Privilege is
    /// dropped for good when the returned guard goes out of scope.
    pub fn raise(&self) -> Result<Privileged<'_, S>, LgqError> {
        self.transition("raise", None, Some(self.orig.effective), None)
            .map_err(LgqError::PrivilegeTransition)?;
        Ok(Privileged { ident: self })
    }

    /// Effective and saved uid become the caller's. Idempotent.
    pub fn relinquish(&self) -> Result<(), LgqError> {
        self.drop_privilege("relinquish").map_err(LgqError::PrivilegeTransition)
    }

    fn drop_privilege(&self, what: &str) -> io::Result<()> {
        self.transition(what, None, Some(self.orig.real), Some(self.orig.real))
    }

    fn transition(
        &self,
        what: &str,
        real: Option<uid_t>,
        effective: Option<uid_t>,
        saved: Option<uid_t>,
    ) -> io::Result<()>
    {
        if let Err(e) = self.ops.setresuid(real, effective, saved) {
            debug!("{}: setresuid({:?}, {:?}, {:?}) failed: {}", what, real, effective, saved, e);
            return Err(e);
        }
        if log_enabled!(log::Level::Debug) {
            if let Ok(u) = self.ops.getresuid() {
                debug!("{}: r:{} e:{} s:{}", what, u.real, u.effective, u.saved);
            }
        }
        Ok(())
    }
}

/// Holds the setuid uid. Dropping it switches to the caller's uid for good;
/// if that fails the process panics, it never continues with an unknown uid.
#[must_use = "privilege is dropped when the guard goes out of scope"]
#[derive(Debug)]
pub struct Privileged<'a, S: UidOps> {
    ident: &'a Identity<S>,
}

impl<'a, S: UidOps> Drop for Privileged<'a, S> {
    fn drop(&mut self) {
        if let Err(e) = self.ident.drop_privilege("release") {
            let real = self.ident.original().real;
            error!("release: cannot switch uid back to {}: {}", real, e);
            panic!("Privileged: cannot switch uid back to {}", real);
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::cell::{Cell, RefCell};
    use std::io;

    use libc::uid_t;

    use super::{ResUid, UidOps};

    /// setresuid(2) semantics on an in-memory uid triple.
    #[derive(Debug)]
    pub(crate) struct MockIds {
        state:     Cell<ResUid>,
        calls:     RefCell<Vec<(Option<uid_t>, Option<uid_t>, Option<uid_t>)>>,
        fail_call: Cell<Option<usize>>,
        fail_get:  Cell<bool>,
    }

    impl MockIds {
        pub(crate) fn new(real: uid_t, effective: uid_t, saved: uid_t) -> MockIds {
            MockIds {
                state:     Cell::new(ResUid { real, effective, saved }),
                calls:     RefCell::new(Vec::new()),
                fail_call: Cell::new(None),
                fail_get:  Cell::new(false),
            }
        }

        /// A setuid-root binary started by `caller`.
        pub(crate) fn setuid_root(caller: uid_t) -> MockIds {
            MockIds::new(caller, 0, 0)
        }

        pub(crate) fn state(&self) -> ResUid {
            self.state.get()
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.borrow().len()
        }

        /// Make the n-th setresuid call (counting from 0) fail with EPERM.
        pub(crate) fn fail_call(&self, n: usize) {
            self.fail_call.set(Some(n));
        }

        pub(crate) fn fail_getresuid(&self) {
            self.fail_get.set(true);
        }
    }

    impl UidOps for MockIds {
        fn getresuid(&self) -> io::Result<ResUid> {
            if self.fail_get.get() {
                return Err(io::Error::from_raw_os_error(libc::EFAULT));
            }
            Ok(self.state.get())
        }

        fn setresuid(&self, real: Option<uid_t>, effective: Option<uid_t>, saved: Option<uid_t>) -> io::Result<()> {
            let n = self.calls.borrow().len();
            self.calls.borrow_mut().push((real, effective, saved));
            if self.fail_call.get() == Some(n) {
                return Err(io::Error::from_raw_os_error(libc::EPERM));
            }
            let cur = self.state.get();
            let allowed = |id: Option<uid_t>| match id {
                None => true,
                Some(id) => cur.effective == 0 || id == cur.real || id == cur.effective || id == cur.saved,
            };
            if !(allowed(real) && allowed(effective) && allowed(saved)) {
                return Err(io::Error::from_raw_os_error(libc::EPERM));
            }
            self.state.set(ResUid {
                real:      real.unwrap_or(cur.real),
                effective: effective.unwrap_or(cur.effective),
                saved:     saved.unwrap_or(cur.saved),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockIds;
    use super::*;

    fn ids(real: uid_t, effective: uid_t, saved: uid_t) -> ResUid {
        ResUid { real, effective, saved }
    }

    #[test]
    fn test_capture() {
        let m = MockIds::setuid_root(1000);
        let ident = Identity::capture(&m).unwrap();
        assert_eq!(ident.original(), ids(1000, 0, 0));
        assert_eq!(m.calls(), 0);
    }

    #[test]
    fn test_capture_fails() {
        let m = MockIds::setuid_root(1000);
        m.fail_getresuid();
        match Identity::capture(&m) {
            Err(LgqError::IdentityQuery(_)) => {},
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(m.calls(), 0);
    }

    #[test]
    fn test_bracket() {
        let m = MockIds::setuid_root(1000);
        let ident = Identity::capture(&m).unwrap();

        ident.assume_caller().unwrap();
        assert_eq!(m.state(), ids(1000, 1000, 0));

        {
            let _guard = ident.raise().unwrap();
            assert_eq!(m.state(), ids(1000, 0, 0));
        }
        assert_eq!(m.state(), ids(1000, 1000, 1000));

        // root is gone for good.
        assert!(ident.raise().is_err());
        assert_eq!(m.state(), ids(1000, 1000, 1000));
    }

    #[test]
    fn test_assume_caller_fails() {
        let m = MockIds::setuid_root(1000);
        m.fail_call(0);
        let ident = Identity::capture(&m).unwrap();
        match ident.assume_caller() {
            Err(LgqError::PrivilegeTransition(e)) => assert_eq!(e.raw_os_error(), Some(libc::EPERM)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_raise_fails_leaves_uids_alone() {
        let m = MockIds::setuid_root(1000);
        m.fail_call(1);
        let ident = Identity::capture(&m).unwrap();
        ident.assume_caller().unwrap();
        assert!(ident.raise().is_err());
        assert_eq!(m.state(), ids(1000, 1000, 0));

        ident.relinquish().unwrap();
        assert_eq!(m.state(), ids(1000, 1000, 1000));
    }

    #[test]
    #[should_panic(expected = "cannot switch uid back to 1000")]
    fn test_release_failure_panics() {
        let m = MockIds::setuid_root(1000);
        m.fail_call(2);
        let ident = Identity::capture(&m).unwrap();
        ident.assume_caller().unwrap();
        let guard = ident.raise().unwrap();
        drop(guard);
    }

    #[test]
    fn test_relinquish_without_raise() {
        let m = MockIds::setuid_root(1000);
        let ident = Identity::capture(&m).unwrap();
        ident.assume_caller().unwrap();
        ident.relinquish().unwrap();
        ident.relinquish().unwrap();
        assert_eq!(m.state(), ids(1000, 1000, 1000));
    }

    #[test]
    fn test_not_setuid() {
        // started by root directly, or installed without the setuid bit.
        for &(r, e) in &[(0, 0), (1000, 1000)] {
            let m = MockIds::new(r, e, e);
            let ident = Identity::capture(&m).unwrap();
            ident.assume_caller().unwrap();
            drop(ident.raise().unwrap());
            ident.relinquish().unwrap();
            assert_eq!(m.state(), ids(r, r, r));
        }
    }

    #[test]
    fn test_libc_getresuid() {
        let u = Libc.getresuid().unwrap();
        assert_eq!(u.real, unsafe { libc::getuid() });
        assert_eq!(u.effective, unsafe { libc::geteuid() });
    }
}
