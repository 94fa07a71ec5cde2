//! Matching a live neighbourhood against a rule table and applying the winner.

use serde::Serialize;
use stca_types::{Coord, Grid, GridError, Pattern, RuleTable};
use tracing::trace;

use crate::symmetry::{Variant, variants};

/// A rule that fired, and the symmetry variant under which it matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Firing {
    pub rule: usize,
    pub variant: Variant,
}

/// Find the rule that would fire on `pattern`, without touching any grid.
///
/// Variants are tried in enumeration order and rules by index within each variant; the
/// first hit wins. Returns the codomain already mapped back to the untransformed frame.
#[must_use]
pub fn find_match(table: &RuleTable, pattern: Pattern) -> Option<(Firing, Pattern)> {
    for variant in variants(table) {
        let transformed = variant.apply(pattern);
        if let Some(rule) = table
            .rules()
            .iter()
            .position(|rule| rule.domain == transformed)
        {
            let codomain = variant.undo(table.rules()[rule].codomain);
            return Some((Firing { rule, variant }, codomain));
        }
    }
    None
}

/// Attempt one transition centred on `coord`.
///
/// On a match the center cell and the touching subcells of its existing neighbours are
/// rewritten and the firing is returned. A miss leaves the grid untouched. Border and
/// out-of-range coordinates are rejected before anything is read.
pub fn try_fire(
    table: &RuleTable,
    grid: &mut Grid,
    coord: Coord,
) -> Result<Option<Firing>, GridError> {
    let pattern = grid.pattern_at(coord)?;
    let Some((firing, codomain)) = find_match(table, pattern) else {
        return Ok(None);
    };
    grid.write_pattern(coord, codomain)?;
    trace!(
        x = coord.x,
        y = coord.y,
        rule = firing.rule,
        reflection = firing.variant.reflection,
        rotation = firing.variant.rotation,
        "transition fired"
    );
    Ok(Some(firing))
}
