//! Neighborhood shapes for focal operations
//!
//! Shapes are specified in map units and resolved to cell offsets against a
//! raster's cell size, so the same neighborhood means the same ground
//! distance on any grid.

/// Neighborhood around a cell, in map units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Neighborhood {
    /// Every cell whose center lies within `radius` of the focal cell center
    Circle { radius: f64 },
    /// Cells whose center distance `d` satisfies `inner < d <= outer`.
    ///
    /// A band thinner than one cell is widened inward to one cell so that it
    /// always contains a ring of cell centers.
    Annulus { inner: f64, outer: f64 },
}

impl Neighborhood {
    pub fn circle(radius: f64) -> Self {
        Neighborhood::Circle { radius }
    }

    pub fn annulus(inner: f64, outer: f64) -> Self {
        Neighborhood::Annulus { inner, outer }
    }

    /// Outer radius in map units
    pub fn outer_radius(&self) -> f64 {
        match *self {
            Neighborhood::Circle { radius } => radius,
            Neighborhood::Annulus { outer, .. } => outer,
        }
    }

    /// Whether a cell center `distance` map units away belongs to the shape
    /// on a grid of `cell_size`
    pub fn contains(&self, distance: f64, cell_size: f64) -> bool {
        // Center distances are sqrt(k) * cell_size; the tolerance keeps cells
        // sitting exactly on a boundary stable.
        let eps = 1e-9 * self.outer_radius().max(1.0);
        match *self {
            Neighborhood::Circle { radius } => distance <= radius + eps,
            Neighborhood::Annulus { inner, outer } => {
                let inner = inner.min(outer - cell_size).max(0.0);
                distance > inner + eps && distance <= outer + eps
            }
        }
    }

    /// Relative (row, col) offsets covered by the shape on a grid of `cell_size`
    pub fn offsets(&self, cell_size: f64) -> Vec<(isize, isize)> {
        let reach = (self.outer_radius() / cell_size).floor() as isize;
        let mut offsets = Vec::new();
        for dr in -reach..=reach {
            for dc in -reach..=reach {
                let distance = ((dr * dr + dc * dc) as f64).sqrt() * cell_size;
                if self.contains(distance, cell_size) {
                    offsets.push((dr, dc));
                }
            }
        }
        offsets
    }
}
