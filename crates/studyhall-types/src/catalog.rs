use serde::{Deserialize, Serialize};

/// A course, year, semester or unit as returned by the catalog endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogNode {
    pub id: u64,
    pub name: String,
}

/// The unit a question is asked against, with its position in the hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSelection {
    pub unit_id: u64,
    pub unit_name: String,
    pub course_path: String,
}

impl UnitSelection {
    /// Build a selection from the path through the hierarchy.
    /// The course path is `Course > Year > Semester`.
    pub fn from_path(
        course: &CatalogNode,
        year: &CatalogNode,
        semester: &CatalogNode,
        unit: &CatalogNode,
    ) -> Self {
        Self {
            unit_id: unit.id,
            unit_name: unit.name.clone(),
            course_path: format!("{} > {} > {}", course.name, year.name, semester.name),
        }
    }
}
