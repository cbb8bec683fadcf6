use anyhow::{Context, Result};
use relax_fluid_sim::Simulation;

fn parse_arg<T: std::str::FromStr>(raw: Option<String>, name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid {name}: {raw}")),
        None => Ok(default),
    }
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let width: usize = parse_arg(args.next(), "width", 64)?;
    let height: usize = parse_arg(args.next(), "height", 64)?;
    let frames: usize = parse_arg(args.next(), "frame count", 600)?;
    let dt = 1.0 / 60.0;

    let mut sim = Simulation::new(width, height, 1.0);
    for frame in 1..=frames {
        let outcome = sim.step(dt);
        if frame % 10 == 0 {
            let avg = sim.average_velocity();
            println!(
                "frame {frame}: avg velocity ({:.5}, {:.5}), projection {} sweeps, max divergence {:.5}",
                avg.x, avg.y, outcome.sweeps, outcome.max_divergence
            );
        }
    }
    Ok(())
}
