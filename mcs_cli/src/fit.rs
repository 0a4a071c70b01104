//! `mcs fit`: closed-form fit through three points.

use mcs_core::{FitModel, TimedPosition};

pub fn run_fit(points: &[(f64, f64)], linear: bool, at: Option<f64>, json: bool) -> eyre::Result<()> {
    let [a, b, c] = points else {
        eyre::bail!("fit needs exactly three --point values, got {}", points.len());
    };
    let model = if linear {
        FitModel::Linear
    } else {
        FitModel::Quadratic
    };
    let q = model.fit(
        TimedPosition::new(a.0, a.1),
        TimedPosition::new(b.0, b.1),
        TimedPosition::new(c.0, c.1),
    )?;
    tracing::debug!(?model, c0 = q.c0, c1 = q.c1, c2 = q.c2, "fit");

    if json {
        let mut obj = serde_json::json!({
            "model": if linear { "linear" } else { "quadratic" },
            "c0": q.c0,
            "c1": q.c1,
            "c2": q.c2,
        });
        if let Some(t) = at {
            obj["at"] = serde_json::json!({
                "t": t,
                "position": q.position(t),
                "velocity": q.velocity(t),
            });
        }
        println!("{obj}");
    } else {
        println!("p(t) = {} + {}*t + {}*t^2", q.c0, q.c1, q.c2);
        if let Some(t) = at {
            println!("at t={t}: position={} velocity={}", q.position(t), q.velocity(t));
        }
    }
    Ok(())
}
