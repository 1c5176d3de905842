//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use log::info;

use crate::error::{Result, VisageError};
use crate::profile::Profile;

/// Print a profile's channels, layers, and expressions.
pub fn inspect(path: &Path) -> Result<()> {
    info!("Inspecting profile: {}", path.display());

    let profile = Profile::load(path)?;

    println!("Profile: {}", path.display());
    println!("Channels ({}):", profile.channels.len());
    for (index, name) in profile.channels.iter().enumerate() {
        println!("  [{:>3}] {}", index, name);
    }

    println!("Layers ({}):", profile.layers.len());
    for layer in &profile.layers {
        println!(
            "  {} (priority {}, weight {:.2}, {})",
            layer.name, layer.priority, layer.weight, layer.policy
        );
    }

    println!("Expressions ({}):", profile.expressions.len());
    for expression in &profile.expressions {
        println!(
            "  {} -> layer {:?}, {} channel(s), {:.2}s",
            expression.id,
            expression.layer,
            expression.channels.len(),
            expression.duration
        );
    }

    Ok(())
}

/// Apply one expression and print the blended output per tick.
pub fn simulate(path: &Path, expression_id: &str, ticks: u32, dt: f32) -> Result<()> {
    info!(
        "Simulating {:?} from {} ({} ticks at {:.4}s)",
        expression_id,
        path.display(),
        ticks,
        dt
    );

    let profile = Profile::load(path)?;
    let mut mixer = profile.build_mixer()?;

    let expression =
        profile
            .expression(expression_id)
            .ok_or_else(|| VisageError::UnknownExpression {
                id: expression_id.to_string(),
            })?;
    expression.apply_to(&mut mixer)?;

    for tick in 0..ticks {
        mixer.prepare_frame(dt);
        print_frame(tick, &mixer);
    }

    println!("Final layer state:");
    for status in mixer.layer_states() {
        println!(
            "  {} [{}] {} active={}",
            status.name,
            status.policy,
            status.state,
            status.active_id.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

fn print_frame(tick: u32, mixer: &crate::engine::Mixer) {
    let values: Vec<String> = mixer
        .output()
        .as_slice()
        .iter()
        .map(|w| format!("{:.3}", w))
        .collect();
    println!("tick {:>4}: [{}]", tick, values.join(", "));
}
