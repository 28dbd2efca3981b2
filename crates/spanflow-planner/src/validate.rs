//! Structural checks run before any operator is built.
//!
//! Operators validate their own predicates against real schemas; this pass
//! only catches what is visible from the document: duplicate ids, duplicate
//! or undeclared tables, reserved attribute names.

use std::collections::HashSet;

use spanflow_core::dag::LogicalPlan;
use spanflow_core::schema::PAYLOAD;

use crate::dsl::yaml::Pipeline;
use crate::error::{PlanError, Result};

pub fn validate(pipeline: &Pipeline) -> Result<()> {
    let mut tables = HashSet::new();
    for t in &pipeline.tables {
        if !tables.insert(t.name.as_str()) {
            return Err(PlanError::Invalid(format!("table '{}' declared twice", t.name)));
        }
        if t.schema.contains(PAYLOAD) {
            return Err(PlanError::Invalid(format!(
                "table '{}' declares reserved attribute '{PAYLOAD}'",
                t.name
            )));
        }
    }
    if !pipeline.tables.is_empty() {
        for table in pipeline.plan.tables() {
            if !tables.contains(table) {
                return Err(PlanError::Invalid(format!("table '{table}' is not declared")));
            }
        }
    }
    validate_plan(&pipeline.plan)
}

/// Checks that hold for any plan tree, declared tables or not.
pub fn validate_plan(plan: &LogicalPlan) -> Result<()> {
    let mut ids = HashSet::new();
    walk(plan, &mut ids)
}

fn walk<'a>(plan: &'a LogicalPlan, ids: &mut HashSet<&'a str>) -> Result<()> {
    if let Some(id) = plan.id() {
        if id.as_str().is_empty() {
            return Err(PlanError::Invalid(format!("{} operator without an id", plan.label())));
        }
        if !ids.insert(id.as_str()) {
            return Err(PlanError::Invalid(format!("operator id '{id}' used twice")));
        }
    }
    match plan {
        LogicalPlan::Scan { table, .. } | LogicalPlan::IndexedScan { table, .. }
            if table.is_empty() =>
        {
            Err(PlanError::Invalid("scan without a table".into()))
        }
        LogicalPlan::Keyword { predicate, .. } if predicate.attributes.is_empty() => Err(
            PlanError::Invalid("keyword operator without attributes".into()),
        ),
        _ => plan.children().into_iter().try_for_each(|c| walk(c, ids)),
    }
}
