use anyhow::Result;

use studyhall_api::Catalog;
use studyhall_types::UnitSelection;

/// Every unit in the catalog with its course path, in catalog order
pub async fn all_units(catalog: &dyn Catalog) -> Result<Vec<UnitSelection>> {
    let mut units = Vec::new();
    walk(catalog, |selection| {
        units.push(selection);
        false
    })
    .await?;
    Ok(units)
}

/// Locate a unit by id, stopping at the first match
pub async fn find_unit(catalog: &dyn Catalog, unit_id: u64) -> Result<Option<UnitSelection>> {
    let mut found = None;
    walk(catalog, |selection| {
        if selection.unit_id == unit_id {
            found = Some(selection);
            true
        } else {
            false
        }
    })
    .await?;
    Ok(found)
}

/// Depth-first walk; `visit` returns `true` to stop
async fn walk<F>(catalog: &dyn Catalog, mut visit: F) -> Result<()>
where
    F: FnMut(UnitSelection) -> bool,
{
    for course in catalog.courses().await? {
        for year in catalog.years(course.id).await? {
            for semester in catalog.semesters(year.id).await? {
                for unit in catalog.units(semester.id).await? {
                    if visit(UnitSelection::from_path(&course, &year, &semester, &unit)) {
                        return Ok(());
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use studyhall_types::CatalogNode;

    fn node(id: u64, name: &str) -> CatalogNode {
        CatalogNode {
            id,
            name: name.to_string(),
        }
    }

    /// Two courses, one year and semester each, two units per semester
    #[derive(Default)]
    struct FixedCatalog {
        unit_calls: AtomicUsize,
    }

    #[async_trait]
    impl Catalog for FixedCatalog {
        async fn courses(&self) -> Result<Vec<CatalogNode>> {
            Ok(vec![node(1, "CS"), node(2, "Maths")])
        }

        async fn years(&self, course_id: u64) -> Result<Vec<CatalogNode>> {
            Ok(vec![node(course_id * 10, "Year 1")])
        }

        async fn semesters(&self, year_id: u64) -> Result<Vec<CatalogNode>> {
            Ok(vec![node(year_id * 10, "Semester 1")])
        }

        async fn units(&self, semester_id: u64) -> Result<Vec<CatalogNode>> {
            self.unit_calls.fetch_add(1, Ordering::SeqCst);
            Ok(match semester_id {
                100 => vec![node(5, "Algorithms"), node(6, "Networks")],
                200 => vec![node(7, "Calculus"), node(8, "Algebra")],
                _ => vec![],
            })
        }
    }

    #[tokio::test]
    async fn test_all_units_with_paths() {
        let catalog = FixedCatalog::default();
        let units = all_units(&catalog).await.unwrap();

        assert_eq!(units.len(), 4);
        assert_eq!(units[0].course_path, "CS > Year 1 > Semester 1");
        assert_eq!(units[3].unit_name, "Algebra");
        assert_eq!(units[3].course_path, "Maths > Year 1 > Semester 1");
    }

    #[tokio::test]
    async fn test_find_unit_stops_early() {
        let catalog = FixedCatalog::default();
        let unit = find_unit(&catalog, 6).await.unwrap().unwrap();

        assert_eq!(unit.unit_name, "Networks");
        assert_eq!(catalog.unit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(find_unit(&catalog, 99).await.unwrap(), None);
    }
}
