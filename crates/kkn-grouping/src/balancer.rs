//! Group formation: gender pre-filter, group count policy, and
//! least-loaded assignment.
//!
//! The balancer only evens out group *sizes*. Program, faculty, and gender
//! counts are tallied on each group for reporting; they never influence
//! which group a student lands in.

use std::collections::BTreeMap;

use kkn_core::{FilterCriteria, GenderFilter, Student};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of groups a cohort is split into when the size band allows it.
pub const PREFERRED_GROUP_COUNT: usize = 12;

/// Members per group used to size the cohort when even the configured
/// maximum would need more than [`PREFERRED_GROUP_COUNT`] groups.
pub const RELAXED_MAX_GROUP_SIZE: usize = 20;

/// One formed group before a location is bound to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Ordinal assigned before empty groups are pruned.
    #[serde(rename = "nomor_kelompok")]
    pub number: u32,
    #[serde(rename = "anggota")]
    pub members: Vec<Student>,
    #[serde(rename = "prodi_count", default)]
    pub program_count: BTreeMap<String, u32>,
    #[serde(rename = "fakultas_count", default)]
    pub faculty_count: BTreeMap<String, u32>,
    #[serde(rename = "kelamin_count", default)]
    pub gender_count: BTreeMap<String, u32>,
}

impl Group {
    fn new(number: u32) -> Self {
        Self {
            number,
            members: Vec::new(),
            program_count: BTreeMap::new(),
            faculty_count: BTreeMap::new(),
            gender_count: BTreeMap::new(),
        }
    }

    fn push(&mut self, student: Student) {
        *self
            .program_count
            .entry(student.program_label().to_string())
            .or_insert(0) += 1;
        *self
            .faculty_count
            .entry(student.faculty_label().to_string())
            .or_insert(0) += 1;
        *self
            .gender_count
            .entry(student.gender_label().to_string())
            .or_insert(0) += 1;
        self.members.push(student);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn distinct_programs(&self) -> usize {
        self.program_count.len()
    }

    pub fn distinct_faculties(&self) -> usize {
        self.faculty_count.len()
    }
}

/// Keep the students that pass the gender filter, in roster order.
pub fn filter_roster(roster: &[Student], filter: GenderFilter) -> Vec<Student> {
    let kept: Vec<Student> = roster
        .iter()
        .filter(|s| filter.accepts(s.gender.as_deref()))
        .cloned()
        .collect();

    if kept.len() < roster.len() {
        debug!(
            filter = filter.as_str(),
            dropped = roster.len() - kept.len(),
            kept = kept.len(),
            "students dropped by gender filter"
        );
    }
    kept
}

/// How many groups `n` students are split into.
///
/// Twelve groups are preferred. If that would average fewer than
/// `min_group_size` members, the count shrinks to `ceil(n / min)`; if it
/// would average more than `max_group_size`, the count becomes
/// `ceil(n / 20)`. The comparisons are done on `n` against `12 * bound`,
/// which is the same test as `n / 12` against the bound without rounding.
pub fn target_group_count(n: usize, criteria: &FilterCriteria) -> usize {
    let min = (criteria.min_group_size as usize).max(1);
    let max = criteria.max_group_size as usize;

    if n < PREFERRED_GROUP_COUNT * min {
        n.div_ceil(min)
    } else if n > PREFERRED_GROUP_COUNT * max {
        n.div_ceil(RELAXED_MAX_GROUP_SIZE)
    } else {
        PREFERRED_GROUP_COUNT
    }
}

/// Split an already filtered roster into groups.
///
/// Students are taken in roster order and each goes to the group with the
/// fewest members, ties going to the lowest-numbered group. Groups left
/// empty are dropped without renumbering the rest.
pub fn form_groups(roster: &[Student], criteria: &FilterCriteria) -> Vec<Group> {
    let count = target_group_count(roster.len(), criteria);
    let mut groups: Vec<Group> = (1..=count as u32).map(Group::new).collect();

    for student in roster {
        let Some(target) = groups.iter_mut().min_by_key(|g| g.len()) else {
            break;
        };
        target.push(student.clone());
    }

    groups.retain(|g| !g.is_empty());

    debug!(
        students = roster.len(),
        target = count,
        formed = groups.len(),
        "groups formed"
    );
    groups
}
