//
// Rendering of the results, in a form the hcc-du python scripts parse.
//
use std::fmt;
use std::io::{self, Write};

use crate::members::{MemberSet, QuotaQuery};

impl fmt::Display for QuotaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.dqblk();
        write!(
            f,
            "if_quotactl(qc_type={},qc_id={},dqb_bhardlimit={},dqb_bsoftlimit={},\
             dqb_curspace={},dqb_ihardlimit={},dqb_isoftlimit={},dqb_curinodes={})",
            self.qc_type(),
            self.qc_id(),
            d.dqb_bhardlimit,
            d.dqb_bsoftlimit,
            d.dqb_curspace,
            d.dqb_ihardlimit,
            d.dqb_isoftlimit,
            d.dqb_curinodes
        )
    }
}

impl fmt::Display for MemberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, query) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", query)?;
        }
        f.write_str("]")
    }
}

/// Write all records in one go. No trailing newline.
pub fn write_records<W: Write>(out: &mut W, members: &MemberSet) -> io::Result<()> {
    write!(out, "{}", members)?;
    out.flush()
}
