//! Sampler group inspection
//!
//! This module lists the groups of a sample file with their grid dimensions, point
//! count and sampled fields, plus the file's time range.

use crate::data_source::{Attributes, SampleSource};
use crate::errors::Result;
use serde::Serialize;
use std::path::Path;

/// Structured description of one sampler group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub name: String,
    /// Grid dimensions as stored, (i, j, k) order
    pub ijk_dims: Vec<usize>,
    pub num_points: usize,
    pub fields: Vec<String>,
    pub attributes: Attributes,
}

/// Time coverage of a file
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSummary {
    pub num_timesteps: usize,
    pub first: Option<f64>,
    pub last: Option<f64>,
}

/// Everything [`summarize_file`] finds in one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub times: TimeSummary,
    pub groups: Vec<GroupSummary>,
}

/// Describe every group of `path`, in storage order.
pub fn summarize_groups(source: &dyn SampleSource, path: &Path) -> Result<Vec<GroupSummary>> {
    source
        .list_groups(path)?
        .into_iter()
        .map(|name| {
            let group = source.open_group(path, &name)?;
            Ok(GroupSummary {
                ijk_dims: group.ijk_dims()?,
                num_points: group.coordinates()?.len() / 3,
                fields: group.field_names()?,
                attributes: group.attributes()?,
                name,
            })
        })
        .collect()
}

/// Describe the time vector and every group of `path`.
pub fn summarize_file(source: &dyn SampleSource, path: &Path) -> Result<FileSummary> {
    let times = source.read_times(path)?;
    Ok(FileSummary {
        times: TimeSummary {
            num_timesteps: times.len(),
            first: times.first().copied(),
            last: times.last().copied(),
        },
        groups: summarize_groups(source, path)?,
    })
}

/// Prints the time range and groups of a file.
pub fn print_file_summary(path: &Path, summary: &FileSummary) {
    println!("\n File: {}", path.display());
    println!("==============");
    match (summary.times.first, summary.times.last) {
        (Some(first), Some(last)) => println!(
            "    {} timesteps, t = {} .. {}",
            summary.times.num_timesteps, first, last
        ),
        _ => println!("    (No timesteps found)"),
    }

    println!("\n Groups");
    println!("==============");
    if summary.groups.is_empty() {
        println!("   (No groups found)");
    }
    for group in &summary.groups {
        let dims: Vec<String> = group.ijk_dims.iter().map(ToString::to_string).collect();
        println!(
            "    {}: ijk_dims = ({}), {} points",
            group.name,
            dims.join(" × "),
            group.num_points
        );
        if !group.fields.is_empty() {
            println!("      └─ fields: {}", group.fields.join(", "));
        }
    }

    println!("\n💡 Tip: Use --group <name> --stat mean --window <t1>:<t2> to average a group");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_io::{MemoryFile, MemoryGroup, MemorySource};

    #[test]
    fn groups_described_in_order() -> Result<()> {
        let hub = MemoryGroup::new(&[2, 1, 1], vec![0.0; 6]).with_field("velocityx", vec![vec![0.0, 0.0]]);
        let line = MemoryGroup::new(&[3, 1, 1], vec![0.0; 9]).with_field("temperature", vec![vec![0.0; 3]]);
        let src = MemorySource::new().with_file(
            "a.nc",
            MemoryFile::new(vec![10.0])
                .with_group("p_hub", hub)
                .with_group("l_tower", line),
        );
        let summary = summarize_file(&src, Path::new("a.nc"))?;
        assert_eq!(summary.times.num_timesteps, 1);
        assert_eq!(summary.times.first, Some(10.0));
        let names: Vec<&str> = summary.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["p_hub", "l_tower"]);
        assert_eq!(summary.groups[1].num_points, 3);
        assert_eq!(summary.groups[0].fields, vec!["velocityx"]);
        assert_eq!(src.open_handles(), 0);
        Ok(())
    }
}
