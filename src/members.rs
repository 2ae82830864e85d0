//
// Collect the users that share a group with the caller.
//
use std::slice;

use libc::{gid_t, uid_t};
use lustre_quota::{LqError, ObdDqblk, USRQUOTA};

use crate::config::{MAX_GROUP_MEMBERS, MAX_SUPPLEMENTARY_GROUPS};
use crate::error::LgqError;
use crate::unixuser::{self, User};

/// The groups of the calling process, at most `MAX_SUPPLEMENTARY_GROUPS`.
#[derive(Debug, Clone)]
pub struct CallerGroups {
    gids: Vec<gid_t>,
}

impl CallerGroups {
    pub fn of_process() -> Result<CallerGroups, LgqError> {
        let gids = unixuser::getgroups().map_err(LgqError::GroupQuery)?;
        Ok(CallerGroups::from_gids(gids))
    }

    pub fn from_gids<I: IntoIterator<Item = gid_t>>(gids: I) -> CallerGroups {
        let mut gids = gids
            .into_iter()
            .take(MAX_SUPPLEMENTARY_GROUPS + 1)
            .collect::<Vec<_>>();
        if gids.len() > MAX_SUPPLEMENTARY_GROUPS {
            warn!("more than {} groups, ignoring the rest", MAX_SUPPLEMENTARY_GROUPS);
            gids.truncate(MAX_SUPPLEMENTARY_GROUPS);
        }
        CallerGroups { gids }
    }

    pub fn contains(&self, gid: gid_t) -> bool {
        self.gids.contains(&gid)
    }

    pub fn len(&self) -> usize {
        self.gids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gids.is_empty()
    }
}

/// Outcome of the quota lookup of one query.
#[derive(Debug)]
pub enum Lookup {
    Pending,
    Found(ObdDqblk),
    Failed(LqError),
}

/// One pending or finished user quota lookup.
#[derive(Debug)]
pub struct QuotaQuery {
    qc_type: u32,
    qc_id:   uid_t,
    lookup:  Lookup,
}

impl QuotaQuery {
    pub fn user(uid: uid_t) -> QuotaQuery {
        QuotaQuery {
            qc_type: USRQUOTA,
            qc_id:   uid,
            lookup:  Lookup::Pending,
        }
    }

    pub fn qc_type(&self) -> u32 {
        self.qc_type
    }

    pub fn qc_id(&self) -> uid_t {
        self.qc_id
    }

    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    /// Usage and limits, all zero unless the lookup succeeded.
    pub fn dqblk(&self) -> ObdDqblk {
        match self.lookup {
            Lookup::Found(d) => d,
            _ => ObdDqblk::default(),
        }
    }

    /// Store the result of the lookup. Only the first call has effect.
    pub(crate) fn record(&mut self, result: Result<ObdDqblk, LqError>) {
        if let Lookup::Pending = self.lookup {
            self.lookup = match result {
                Ok(d) => Lookup::Found(d),
                Err(e) => Lookup::Failed(e),
            };
        } else {
            warn!("QuotaQuery::record: uid {}: already recorded", self.qc_id);
        }
    }
}

/// Fixed-capacity list of queries. Queries beyond the capacity are
/// dropped, not an error.
#[derive(Debug)]
pub struct MemberSet {
    queries:  Vec<QuotaQuery>,
    capacity: usize,
    dropped:  usize,
}

impl MemberSet {
    pub fn with_capacity(capacity: usize) -> MemberSet {
        MemberSet {
            queries:  Vec::with_capacity(capacity),
            capacity: capacity,
            dropped:  0,
        }
    }

    /// Append `query`, returns false if the set is full.
    pub fn push(&mut self, query: QuotaQuery) -> bool {
        if self.queries.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.queries.push(query);
        true
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of queries that did not fit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn iter(&self) -> slice::Iter<'_, QuotaQuery> {
        self.queries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> slice::IterMut<'_, QuotaQuery> {
        self.queries.iter_mut()
    }
}

impl<'a> IntoIterator for &'a MemberSet {
    type Item = &'a QuotaQuery;
    type IntoIter = slice::Iter<'a, QuotaQuery>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Build a query for every user whose primary group is one of `groups`.
/// Needs no privilege.
pub fn collect_members<I>(groups: &CallerGroups, users: I) -> Result<MemberSet, LgqError>
where I: IntoIterator<Item = User> {
    if groups.is_empty() {
        return Err(LgqError::NoGroups);
    }

    let mut members = MemberSet::with_capacity(MAX_GROUP_MEMBERS);
    for user in users {
        if groups.contains(user.gid) {
            if members.push(QuotaQuery::user(user.uid)) {
                debug!("collect_members: {} uid {} gid {}", user.name, user.uid, user.gid);
            }
        }
    }

    if members.dropped() > 0 {
        warn!(
            "collect_members: {} users over the limit of {} were skipped",
            members.dropped(),
            members.capacity()
        );
    }
    if members.is_empty() {
        return Err(LgqError::NoMembers);
    }
    debug!("collect_members: {} users in {} groups", members.len(), groups.len());
    Ok(members)
}
