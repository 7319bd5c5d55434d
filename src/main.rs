//! Entry point for the sample_planes application.
//! Handles CLI parsing and dispatches group listing, extraction and the statistics passes.

use clap::Parser;
use sample_planes::metadata::{print_file_summary, summarize_file};
use sample_planes::prelude::*;
use sample_planes::record::write_json;
mod cli;

use cli::{Args, StatArg};

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("sample_planes", level)
        .format_timestamp(None)
        .format_module_path(false)
        .init();
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();
    init_logging(args.verbose);

    let source = NetcdfSource::new();

    if args.list_groups {
        for path in &args.file {
            let summary = summarize_file(&source, path)?;
            print_file_summary(path, &summary);
        }
        return Ok(());
    }

    let layout = if args.line {
        GridLayout::Line
    } else {
        GridLayout::Plane
    };

    if let Some(output_dt) = args.full_plane {
        let path = args.single_file("--full-plane")?;
        let record = extract_full_plane(&source, path, args.group.as_deref(), output_dt, args.ordering)?;
        println!(
            "✅ Read {} timesteps of group '{}' with dimensions ({})",
            record.times.len(),
            record.group,
            record.dims.join(", ")
        );
        if let Some(output) = &args.output_json {
            record.write_json(output)?;
            println!("✅ Saved result to {}", output.display());
        }
        return Ok(());
    }

    if let Some(timesteps) = &args.extract {
        let path = args.single_file("--extract")?;
        let mut request = ExtractRequest::new(timesteps.clone())
            .fields(&args.vars)
            .layout(layout)
            .include_times(args.include_times)
            .include_attributes(args.include_attrs);
        if let Some(group) = &args.group {
            request = request.group(group.clone());
        }

        if args.points.is_empty() {
            let record = extract_planes(&source, path, &request)?;
            println!(
                "✅ Extracted {} timesteps of {} fields from group '{}'",
                record.timesteps.len(),
                record.fields.len(),
                record.group
            );
            if let Some(output) = &args.output_json {
                record.write_json(output)?;
                println!("✅ Saved result to {}", output.display());
            }
        } else {
            let record = extract_points(&source, path, &request, &args.points)?;
            if let Some(output) = &args.output_json {
                record.write_json(output)?;
                println!("✅ Saved result to {}", output.display());
            } else {
                println!("{}", serde_json::to_string_pretty(&record.series)?);
            }
        }
        return Ok(());
    }

    let Some(stat) = args.stat else {
        for path in &args.file {
            print_file_summary(path, &summarize_file(&source, path)?);
        }
        return Ok(());
    };
    let (start, end) = args
        .window
        .ok_or("--window <t1>:<t2> is required with --stat")?;

    let mut request = AggregateRequest::new(args.file.clone(), TimeWindow::new(start, end))
        .variables(&args.vars)
        .replace_nan(args.replace_nan)
        .include_attributes(args.include_attrs)
        .layout(layout);
    if let Some(group) = &args.group {
        request = request.group(group.clone());
    }
    if !args.points.is_empty() {
        request = request.points(args.points.clone());
    }

    let parallel = ParallelConfig::new(args.threads).per_file(args.per_file_parallel);
    if args.verbose {
        sample_planes::parallel::get_parallel_info().print_info();
    }
    let progress = ConsoleProgress::default();
    let mut aggregator = Aggregator::new(&source).with_parallel(parallel);
    if args.progress {
        aggregator = aggregator.with_progress(&progress);
    }

    let record = match stat {
        StatArg::Mean => aggregator.mean(&request)?,
        StatArg::MinMaxStd => aggregator.min_max_std(&request, None)?,
        StatArg::Reynolds => aggregator.reynolds_stress(&request, None)?,
        StatArg::All => aggregator.combined(&request, &Correlation::reynolds_stresses())?,
    };

    if record.is_empty_window() {
        println!("⚠ No timesteps inside [{start}, {end}]; statistics were not normalised");
    } else {
        println!(
            "✅ Accumulated {} timesteps of group '{}' over {} files",
            record.count,
            record.group,
            args.file.len()
        );
    }

    if let Some(output) = &args.output_json {
        write_json(&record, output)?;
        println!("✅ Saved result to {}", output.display());
    }
    if let Some(output) = &args.output_netcdf {
        write_stats_to_netcdf(&record, output)?;
        println!("✅ Saved result to {}", output.display());
    }
    if args.output_json.is_none() && args.output_netcdf.is_none() {
        for (kind, name, field) in record.stats.iter() {
            println!("{name}_{}: {field}", kind.suffix());
        }
    }

    Ok(())
}
