// src/cli/route.rs — `walkly route` / `walkly alternatives`

use super::RouteArgs;
use crate::geo::format::{format_distance, format_duration};
use crate::infra::config::Config;
use crate::route::{resolver, GeneratedRoute, RouteGenerator, RoutePlanner};

fn build_generator(args: &RouteArgs, config: &Config) -> anyhow::Result<RouteGenerator> {
    let provider = resolver::build_provider(&config.routing)?;
    let mut generator = RouteGenerator::from_config(provider, &config.routing);
    if let Some(seed) = args.seed {
        generator = generator.with_seed(seed);
    }
    Ok(generator)
}

pub async fn run_route(args: RouteArgs, json: bool, config: &Config) -> anyhow::Result<()> {
    let options = args.to_options()?;
    let generator = build_generator(&args, config)?;

    let route = generator.generate(&options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&route)?);
    } else {
        print_route(&route, generator.provider_id());
    }
    Ok(())
}

pub async fn run_alternatives(args: RouteArgs, count: usize, config: &Config) -> anyhow::Result<()> {
    let options = args.to_options()?;
    let generator = build_generator(&args, config)?;

    let results = generator.generate_alternatives(&options, count).await;
    let mut ok = 0;
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(route) => {
                ok += 1;
                println!(
                    "#{}  {:>8}  ~{} min  {} waypoints  {} points",
                    i + 1,
                    format_distance(route.distance),
                    (route.duration / 60.0).round() as u64,
                    route.waypoints.len(),
                    route.coordinates.len()
                );
            }
            Err(e) => println!("#{}  failed: {}", i + 1, e),
        }
    }

    if ok == 0 && count > 0 {
        anyhow::bail!("no alternative could be generated");
    }
    Ok(())
}

pub fn print_route(route: &GeneratedRoute, provider: &str) {
    println!("Loop route ({provider})");
    println!("  Distance:   {}", format_distance(route.distance));
    println!(
        "  Duration:   {} (~{} min)",
        format_duration(route.duration.max(0.0) as u64),
        (route.duration / 60.0).round() as u64
    );
    println!("  Waypoints:  {}", route.waypoints.len());
    for wp in &route.waypoints {
        println!("    {wp}");
    }
    println!("  Path:       {} points", route.coordinates.len());

    if let Some(steps) = &route.instructions {
        println!();
        for (i, step) in steps.iter().enumerate() {
            println!("  {:>2}. {}", i + 1, strip_tags(step));
        }
    }
}

/// Directions text arrives with inline HTML markup.
fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
