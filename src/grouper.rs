//! Depth-first partitioning of the index into series groups.

use std::path::PathBuf;

use dicom::core::Tag;

use crate::index::{Constraint, IndexError, SeriesIndex};
use crate::naming;

/// Files sharing one value per grouping tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesGroup {
    /// Output name composed from the matched values. Empty when grouping by
    /// no tags.
    pub name: String,
    pub constraints: Vec<Constraint>,
    pub files: Vec<PathBuf>,
}

pub struct Grouper<'a> {
    index: &'a SeriesIndex,
}

impl<'a> Grouper<'a> {
    pub fn new(index: &'a SeriesIndex) -> Self {
        Self { index }
    }

    /// Visit every non-empty group of the cartesian product of the tags'
    /// distinct values.
    ///
    /// Tags are consumed in the given order and values in index order, so
    /// the visiting order is deterministic. Combinations that match no file
    /// are skipped.
    pub fn for_each_group<F>(&self, tags: &[Tag], mut visit: F) -> Result<(), IndexError>
    where
        F: FnMut(SeriesGroup),
    {
        self.index.ensure_columns(tags)?;
        let mut constraints = Vec::with_capacity(tags.len());
        self.descend(tags, &mut constraints, None, &mut visit)
    }

    /// Collect all non-empty groups.
    pub fn groups(&self, tags: &[Tag]) -> Result<Vec<SeriesGroup>, IndexError> {
        let mut groups = Vec::new();
        self.for_each_group(tags, |group| groups.push(group))?;
        Ok(groups)
    }

    fn descend<F>(
        &self,
        tags: &[Tag],
        constraints: &mut Vec<Constraint>,
        name: Option<&str>,
        visit: &mut F,
    ) -> Result<(), IndexError>
    where
        F: FnMut(SeriesGroup),
    {
        let Some((&tag, rest)) = tags.split_first() else {
            let files: Vec<PathBuf> = self
                .index
                .filter(constraints)?
                .into_iter()
                .map(|p| p.to_path_buf())
                .collect();
            if !files.is_empty() {
                visit(SeriesGroup {
                    name: name.unwrap_or_default().to_string(),
                    constraints: constraints.clone(),
                    files,
                });
            }
            return Ok(());
        };

        for value in self.index.distinct_values(tag)? {
            let extended = naming::compose(name, value);
            constraints.push((tag, value.to_string()));
            let result = self.descend(rest, constraints, Some(&extended), visit);
            constraints.pop();
            result?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SliceRecord;

    const SERIES: Tag = Tag(0x0020, 0x0011);
    const DESCRIPTION: Tag = Tag(0x0008, 0x103E);

    fn index() -> SeriesIndex {
        let rows = [
            ("3", "AX", "1.dcm"),
            ("3", "AX", "2.dcm"),
            ("4", "COR", "3.dcm"),
            ("4", "R/DIS2D", "4.dcm"),
            ("3", "AX", "5.dcm"),
        ];
        SeriesIndex::from_records(
            vec![SERIES, DESCRIPTION],
            rows.iter()
                .map(|(series, description, path)| SliceRecord {
                    values: vec![series.to_string(), description.to_string()],
                    path: PathBuf::from(path),
                })
                .collect(),
        )
    }

    #[test]
    fn groups_by_two_tags_with_composed_names() {
        let index = index();
        let groups = Grouper::new(&index).groups(&[SERIES, DESCRIPTION]).unwrap();
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        // (3, COR), (3, R/DIS2D), (4, AX) match nothing and are dropped
        assert_eq!(names, vec!["3-AX", "4-COR", "4-R.DIS2D"]);
        assert_eq!(
            groups[0].files,
            vec![
                PathBuf::from("1.dcm"),
                PathBuf::from("2.dcm"),
                PathBuf::from("5.dcm")
            ]
        );
        assert_eq!(
            groups[2].constraints,
            vec![(SERIES, "4".to_string()), (DESCRIPTION, "R/DIS2D".to_string())]
        );
    }

    #[test]
    fn tag_order_decides_name_order() {
        let index = index();
        let groups = Grouper::new(&index).groups(&[DESCRIPTION, SERIES]).unwrap();
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["AX-3", "COR-4", "R.DIS2D-4"]);
    }

    #[test]
    fn groups_partition_the_index() {
        let index = index();
        let groups = Grouper::new(&index).groups(&[SERIES]).unwrap();
        let total: usize = groups.iter().map(|g| g.files.len()).sum();
        assert_eq!(total, index.len());

        let mut all: Vec<_> = groups.iter().flat_map(|g| g.files.clone()).collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), index.len());
    }

    #[test]
    fn no_tags_yields_a_single_group() {
        let index = index();
        let groups = Grouper::new(&index).groups(&[]).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "");
        assert_eq!(groups[0].files.len(), 5);
    }

    #[test]
    fn empty_index_yields_no_groups() {
        let index = SeriesIndex::from_records(vec![SERIES], Vec::new());
        assert!(Grouper::new(&index).groups(&[SERIES]).unwrap().is_empty());
        assert!(Grouper::new(&index).groups(&[]).unwrap().is_empty());
    }

    #[test]
    fn grouping_key_must_be_indexed() {
        let index = index();
        let result = Grouper::new(&index).groups(&[Tag(0x0008, 0x0060)]);
        assert!(matches!(result, Err(IndexError::UnknownTag(_))));
    }
}
