//! Analytic scenarios standing in for the solver.
//!
//! Each scenario owns a field layout and writes the value of every field at a
//! cell center for a given time. The driver resamples the leaves once per
//! iteration, then adapts.

use glam::DVec2;

use crate::config::ScenarioKind;

pub trait Scenario {
  /// Field names stored per cell, in layout order.
  fn fields(&self) -> &'static [&'static str];

  /// Time advanced per iteration.
  fn time_step(&self) -> f64;

  /// Write the fields at `center` into `out`.
  fn sample(&self, center: DVec2, cell_size: f64, t: f64, out: &mut [f64]);
}

pub fn build(kind: ScenarioKind) -> Box<dyn Scenario> {
  match kind {
    ScenarioKind::Bump => Box::new(Bump::default()),
    ScenarioKind::MovingCylinder => Box::new(MovingCylinder::default()),
  }
}

// =============================================================================
// Bump
// =============================================================================

/// Depth `h = base + exp(-r^2 / w)` spreading by diffusion.
///
/// The width grows as `w(t) = w0 + 4 kappa t` and the amplitude shrinks as
/// `w0 / w(t)`, so the volume above `base` is conserved.
#[derive(Clone, Copy, Debug)]
pub struct Bump {
  pub base: f64,
  pub width: f64,
  pub diffusivity: f64,
  pub dt: f64,
}

impl Default for Bump {
  fn default() -> Self {
    Self {
      base: 0.1,
      width: 1.0 / 200.0,
      diffusivity: 1e-3,
      dt: 1e-3,
    }
  }
}

impl Bump {
  pub fn depth(&self, point: DVec2, t: f64) -> f64 {
    let w = self.width + 4.0 * self.diffusivity * t;
    self.base + self.width / w * (-point.length_squared() / w).exp()
  }
}

impl Scenario for Bump {
  fn fields(&self) -> &'static [&'static str] {
    &["h"]
  }

  fn time_step(&self) -> f64 {
    self.dt
  }

  fn sample(&self, center: DVec2, _cell_size: f64, t: f64, out: &mut [f64]) {
    out[0] = self.depth(center, t);
  }
}

// =============================================================================
// Moving cylinder
// =============================================================================

/// Cylinder moving at `velocity` from the origin through fluid at rest.
///
/// Outside the solid the velocity is the potential flow around the cylinder;
/// inside it is the solid velocity. Cut cells blend both with the solid
/// volume fraction.
#[derive(Clone, Copy, Debug)]
pub struct MovingCylinder {
  pub radius: f64,
  pub velocity: DVec2,
  pub dt: f64,
}

impl Default for MovingCylinder {
  fn default() -> Self {
    Self {
      radius: 0.0625,
      velocity: DVec2::new(1.0, 0.0),
      dt: 5e-3,
    }
  }
}

impl MovingCylinder {
  pub fn center(&self, t: f64) -> DVec2 {
    self.velocity * t
  }

  /// Solid fraction of a cell, from the signed distance to the surface.
  pub fn fraction(&self, center: DVec2, cell_size: f64, t: f64) -> f64 {
    let distance = center.distance(self.center(t)) - self.radius;
    (0.5 - distance / cell_size).clamp(0.0, 1.0)
  }

  /// Potential flow velocity induced by the moving cylinder.
  pub fn fluid_velocity(&self, point: DVec2, t: f64) -> DVec2 {
    let rel = point - self.center(t);
    let r2 = rel.length_squared();
    if r2 <= self.radius * self.radius {
      return self.velocity;
    }
    let a2 = self.radius * self.radius;
    let (x, y) = (rel.x, rel.y);
    let (u, v) = (self.velocity.x, self.velocity.y);
    // Dipole of strength U a^2 aligned with the motion.
    let scale = a2 / (r2 * r2);
    DVec2::new(
      scale * (u * (x * x - y * y) + v * 2.0 * x * y),
      scale * (u * 2.0 * x * y + v * (y * y - x * x)),
    )
  }
}

impl Scenario for MovingCylinder {
  fn fields(&self) -> &'static [&'static str] {
    &["u.x", "u.y", "cylinder"]
  }

  fn time_step(&self) -> f64 {
    self.dt
  }

  fn sample(&self, center: DVec2, cell_size: f64, t: f64, out: &mut [f64]) {
    let solid = self.fraction(center, cell_size, t);
    let u = self.velocity * solid + self.fluid_velocity(center, t) * (1.0 - solid);
    out[0] = u.x;
    out[1] = u.y;
    out[2] = solid;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_bump_matches_initial_profile() {
    let bump = Bump::default();
    assert!((bump.depth(DVec2::ZERO, 0.0) - 1.1).abs() < 1e-12);
    let p = DVec2::new(0.1, 0.05);
    let expected = 0.1 + (-200.0f64 * (0.01 + 0.0025)).exp();
    assert!((bump.depth(p, 0.0) - expected).abs() < 1e-12);
  }

  #[test]
  fn test_bump_spreads_over_time() {
    let bump = Bump::default();
    assert!(bump.depth(DVec2::ZERO, 1.0) < bump.depth(DVec2::ZERO, 0.0));
    let far = DVec2::new(0.2, 0.0);
    assert!(bump.depth(far, 1.0) > bump.depth(far, 0.0));
  }

  #[test]
  fn test_cylinder_fraction() {
    let cylinder = MovingCylinder::default();
    let h = 1.0 / 64.0;
    assert_eq!(cylinder.fraction(DVec2::ZERO, h, 0.0), 1.0);
    assert_eq!(cylinder.fraction(DVec2::new(0.5, 0.0), h, 0.0), 0.0);
    let on_surface = DVec2::new(cylinder.radius, 0.0);
    assert!((cylinder.fraction(on_surface, h, 0.0) - 0.5).abs() < 1e-12);
    // The solid has moved by t * velocity.
    assert_eq!(cylinder.fraction(DVec2::new(1.0, 0.0), h, 1.0), 1.0);
  }

  /// Fluid velocity matches the solid on the surface along the motion axis
  /// and decays away from it.
  #[test]
  fn test_cylinder_potential_flow() {
    let cylinder = MovingCylinder::default();
    let front = DVec2::new(cylinder.radius * 1.0001, 0.0);
    let u = cylinder.fluid_velocity(front, 0.0);
    assert!((u.x - 1.0).abs() < 1e-3, "got {u}");
    assert!(u.y.abs() < 1e-12);

    let far = cylinder.fluid_velocity(DVec2::new(2.0, 0.0), 0.0);
    assert!(far.length() < 1e-2);
  }

  #[test]
  fn test_sample_layout() {
    let cylinder = MovingCylinder::default();
    let mut out = [0.0; 3];
    cylinder.sample(DVec2::ZERO, 1.0 / 64.0, 0.0, &mut out);
    assert_eq!(out, [1.0, 0.0, 1.0]);
    assert_eq!(cylinder.fields().len(), out.len());
  }
}
