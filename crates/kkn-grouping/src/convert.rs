//! Conversion between engine results and store records.

use kkn_state::{GroupingHistory, GroupingMember};

use crate::orchestrator::GroupingResult;

/// Build the history header for a result. The id and timestamp are left
/// for the store to assign.
pub fn to_history_record(result: &GroupingResult) -> serde_json::Result<GroupingHistory> {
    Ok(GroupingHistory {
        id: 0,
        cohort_name: result.cohort_name.clone(),
        cohort_number: result.cohort_number,
        group_count: result.group_count,
        student_count: result.student_count,
        data_grouping: serde_json::to_value(&result.groups)?,
        filter_criteria: Some(result.criteria.clone()),
        created_at: 0,
    })
}

/// One detail row per placed student, in group order.
pub fn to_member_rows(result: &GroupingResult) -> Vec<GroupingMember> {
    result
        .groups
        .iter()
        .flat_map(|pg| {
            pg.group.members.iter().map(move |s| GroupingMember {
                grouping_id: 0,
                group_number: pg.group.number,
                location: Some(pg.placement.name.clone()),
                village_district: pg.placement.village_district.clone(),
                regency: pg.placement.regency.clone(),
                nim: (!s.nim.is_empty()).then(|| s.nim.clone()),
                name: (!s.name.is_empty()).then(|| s.name.clone()),
                program: s.program.clone(),
                faculty: s.faculty.clone(),
                phone: s.phone.clone(),
            })
        })
        .collect()
}
