use std::fmt::{self, Display, Formatter};

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::*;
use num_traits::Float;

use crate::decomposition::Decomposition;
use crate::voronoi::SimplexState;

impl<F, const D: usize> Decomposition<F, D>
where
    F: Float + Display,
{
    /// Terminal table of the terms, largest weight share in the last column.
    pub fn display(&self) -> String {
        let total = self.weights.iter().fold(F::zero(), |acc, &w| acc + w);

        let mut title_table = Table::new();
        title_table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .add_row(vec![
                Cell::new(format!("Tensor decomposition (D = {}, {} terms)", D, self.len()))
                    .set_alignment(CellAlignment::Center),
            ]);

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("#").set_alignment(CellAlignment::Center),
                Cell::new("Offset").set_alignment(CellAlignment::Center),
                Cell::new("Weight").set_alignment(CellAlignment::Center),
                Cell::new("Share").set_alignment(CellAlignment::Center),
            ]);

        for (i, (offset, weight)) in self.terms().enumerate() {
            let share = if total > F::zero() {
                format!("{:.1}%", (weight / total).to_f64().unwrap_or(0.0) * 100.0)
            } else {
                "-".to_string()
            };
            table.add_row(vec![
                Cell::new(i).set_alignment(CellAlignment::Right),
                Cell::new(offset).set_alignment(CellAlignment::Left),
                Cell::new(format!("{:.6}", weight)).set_alignment(CellAlignment::Right),
                Cell::new(share).set_alignment(CellAlignment::Right),
            ]);
        }

        format!("{}\n{}", title_table, table)
    }
}

impl<F, const D: usize> Display for Decomposition<F, D>
where
    F: Float + Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl<const D: usize> SimplexState<D> {
    /// Summary of where the Voronoi walk stopped.
    pub fn display(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Voronoi walk").set_alignment(CellAlignment::Center),
                Cell::new("Value").set_alignment(CellAlignment::Center),
            ]);

        table
            .add_row(vec![
                Cell::new("Dimension").set_alignment(CellAlignment::Left),
                Cell::new(D).set_alignment(CellAlignment::Right),
            ])
            .add_row(vec![
                Cell::new("Vertex").set_alignment(CellAlignment::Left),
                Cell::new(self.vertex()).set_alignment(CellAlignment::Right),
            ])
            .add_row(vec![
                Cell::new("Moves").set_alignment(CellAlignment::Left),
                Cell::new(self.moves()).set_alignment(CellAlignment::Right),
            ])
            .add_row(vec![
                Cell::new("Objective").set_alignment(CellAlignment::Left),
                Cell::new(format!("{:.6e}", self.objective())).set_alignment(CellAlignment::Right),
            ])
            .add_row(vec![
                Cell::new("Basis").set_alignment(CellAlignment::Left),
                Cell::new(self.basis()).set_alignment(CellAlignment::Right),
            ]);

        table.to_string()
    }
}

impl<const D: usize> Display for SimplexState<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}
