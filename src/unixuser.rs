use std::ffi::CStr;
use std::io;
use std::marker::PhantomData;

use libc::{gid_t, uid_t};

/// One entry of the user database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub uid:  uid_t,
    pub gid:  gid_t,
}

unsafe fn to_user(pwd: &libc::passwd) -> User {
    let cs_name = CStr::from_ptr(pwd.pw_name);
    User {
        name: cs_name.to_string_lossy().into_owned(),
        uid:  pwd.pw_uid,
        gid:  pwd.pw_gid,
    }
}

/// Walks the user database with setpwent/getpwent, and calls endpwent
/// when dropped. getpwent is not thread-safe, so this is not Send.
#[derive(Debug)]
pub struct Passwd {
    done:      bool,
    _not_send: PhantomData<*const ()>,
}

impl Passwd {
    pub fn open() -> Passwd {
        unsafe { libc::setpwent() };
        Passwd {
            done:      false,
            _not_send: PhantomData,
        }
    }
}

impl Iterator for Passwd {
    type Item = User;

    fn next(&mut self) -> Option<User> {
        if self.done {
            return None;
        }
        let pwd = unsafe { libc::getpwent() };
        if pwd.is_null() {
            self.done = true;
            return None;
        }
        Some(unsafe { to_user(&*pwd) })
    }
}

impl Drop for Passwd {
    fn drop(&mut self) {
        unsafe { libc::endpwent() };
    }
}

/// The supplementary groups of the process.
pub fn getgroups() -> io::Result<Vec<gid_t>> {
    let n = unsafe { libc::getgroups(0, std::ptr::null_mut()) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    let mut gids: Vec<gid_t> = vec![0; n as usize];
    let n = unsafe { libc::getgroups(n, gids.as_mut_ptr()) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    gids.truncate(n as usize);
    Ok(gids)
}
