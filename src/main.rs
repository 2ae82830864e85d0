//
//  lgq: Lustre group quota.
//
//  Prints the Lustre quota usage of all users whose primary group is one
//  of the caller's groups. Must be setuid root:
//
//      chown root:root lgq; chmod 4511 lgq
//
#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

mod config;
mod error;
mod members;
mod output;
mod quota;
mod suid;
mod unixuser;

use std::io;
use std::path::Path;
use std::process::exit;

use clap::{App, ArgMatches};
use log::LevelFilter;

use crate::error::LgqError;
use crate::members::{collect_members, CallerGroups, MemberSet};
use crate::quota::fetch_quotas;
use crate::suid::{Identity, Libc, UidOps};
use crate::unixuser::{Passwd, User};

// Anything but -v is ignored. Help and version are disabled: stdout
// carries the records and nothing else.
fn cli() -> App<'static, 'static> {
    clap_app!(lgq =>
        (version: crate_version!())
        (about: "Lustre quota usage of every user in the caller's groups")
        (@setting AllowLeadingHyphen)
        (@setting TrailingVarArg)
        (@setting DisableHelpFlags)
        (@setting DisableVersion)
        (@arg VERBOSE: -v --verbose ... "Diagnostics on stderr, repeat for more")
        (@arg ARGS: ... +hidden "Ignored")
    )
}

fn log_level(matches: &ArgMatches) -> LevelFilter {
    match matches.occurrences_of("VERBOSE") {
        0 => LevelFilter::Off,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

fn main() {
    let matches = cli().get_matches();

    // setuid: never configure logging from the environment.
    env_logger::Builder::new().filter_level(log_level(&matches)).init();

    let ident = match Identity::capture(Libc) {
        Ok(ident) => ident,
        Err(e) => fatal(e),
    };

    let result = run(&ident, Path::new(config::MOUNT_POINT));

    // whatever happened, root must be gone before we exit.
    if let Err(e) = ident.relinquish() {
        fatal(e);
    }

    let members = match result {
        Ok(members) => members,
        Err(e) => fatal(e),
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = output::write_records(&mut out, &members) {
        fatal(LgqError::Output(e));
    }
}

fn fatal(e: LgqError) -> ! {
    error!("{}", e);
    exit(1);
}

fn run<S: UidOps>(ident: &Identity<S>, mount: &Path) -> Result<MemberSet, LgqError> {
    ident.assume_caller()?;
    let groups = CallerGroups::of_process()?;
    report(ident, mount, &groups, Passwd::open())
}

// Everything after the caller's uid has been assumed.
fn report<S, I>(ident: &Identity<S>, mount: &Path, groups: &CallerGroups, users: I) -> Result<MemberSet, LgqError>
where
    S: UidOps,
    I: IntoIterator<Item = User>,
{
    let mut members = collect_members(groups, users)?;
    let summary = fetch_quotas(mount, &mut members, ident)?;
    info!(
        "{}: {} quotas found, {} lookups failed",
        mount.display(),
        summary.found,
        summary.failed
    );
    Ok(members)
}
