//! Step data — one unit of externally supplied play data
//!
//! Every optional sub-list deserializes to empty when absent, so mechanics can
//! iterate without checking for presence.

use serde::{Deserialize, Serialize};

use crate::types::Position;

/// One step handed to the active mechanism
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepData {
    /// Index of this step within the sequence
    pub step_index: u32,

    /// Step identifier from the round source
    #[serde(default)]
    pub step_id: String,

    /// Symbol matrix, `matrix[row][col]`
    #[serde(default)]
    pub matrix: Vec<Vec<String>>,

    /// Wins evaluated for this step
    #[serde(default)]
    pub wins: Vec<WinInfo>,

    /// Sum of this step's wins before any mechanism multiplier
    #[serde(default)]
    pub total_step_win: f64,

    /// Special symbols that landed this step
    #[serde(default)]
    pub special_symbols: Vec<SpecialSymbolLanding>,

    /// Positions the round source declares locked
    #[serde(default)]
    pub locked_positions: Vec<PositionValue>,

    /// Value tags attached to positions
    #[serde(default)]
    pub position_values: Vec<PositionValue>,

    /// Multiplier hint from the round source
    #[serde(default)]
    pub multiplier: Option<f64>,

    /// Board modifiers applied this step
    #[serde(default)]
    pub modifiers: Vec<Modifier>,

    /// Explicit symbol transformations this step
    #[serde(default)]
    pub transformations: Vec<Transformation>,

    /// Game-specific extras
    #[serde(default)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

/// A single evaluated win
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinInfo {
    pub symbol: String,
    #[serde(default)]
    pub positions: Vec<Position>,
    pub amount: f64,
    #[serde(default)]
    pub match_count: u32,
}

/// What a special symbol does when it lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LandingEffect {
    Lock,
    Collect,
    Multiply,
    Transform,
    Expand,
    /// Any effect this engine does not interpret
    #[serde(other)]
    Other,
}

/// A special symbol landing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialSymbolLanding {
    pub position: Position,
    #[serde(alias = "symbolId")]
    pub symbol: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub effect: Option<LandingEffect>,
}

/// A position with an attached value (and optionally the symbol on it)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionValue {
    pub position: Position,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Board modifier kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifierKind {
    AddSymbol,
    RemoveSymbol,
    ReelChange,
    AddMultiplier,
    ExpandGrid,
    SymbolSwap,
}

/// A board modifier drawn by the round source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    #[serde(rename = "type", alias = "kind")]
    pub kind: ModifierKind,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub target_symbol: Option<String>,
}

impl Modifier {
    pub fn new(kind: ModifierKind, value: f64) -> Self {
        Self {
            kind,
            value,
            positions: Vec::new(),
            symbol: None,
            target_symbol: None,
        }
    }
}

/// An explicit symbol transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    pub position: Position,
    pub from: String,
    pub to: String,
}

impl StepData {
    /// Create an empty step at the given index
    pub fn new(step_index: u32) -> Self {
        Self {
            step_index,
            step_id: format!("step-{step_index}"),
            ..Default::default()
        }
    }

    /// Builder: set the symbol matrix
    pub fn with_matrix<S: Into<String>>(mut self, rows: Vec<Vec<S>>) -> Self {
        self.matrix = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        self
    }

    /// Builder: set the total step win
    pub fn with_total_win(mut self, win: f64) -> Self {
        self.total_step_win = win;
        self
    }

    /// Builder: add a win
    pub fn with_win(mut self, win: WinInfo) -> Self {
        self.total_step_win += win.amount;
        self.wins.push(win);
        self
    }

    /// Builder: add a special symbol landing
    pub fn with_landing(mut self, position: Position, symbol: &str, value: f64) -> Self {
        self.special_symbols.push(SpecialSymbolLanding {
            position,
            symbol: symbol.to_string(),
            value,
            effect: None,
        });
        self
    }

    /// Builder: add a modifier
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Builder: add an explicit transformation
    pub fn with_transformation(mut self, position: Position, from: &str, to: &str) -> Self {
        self.transformations.push(Transformation {
            position,
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    /// Builder: declare a position locked by the round source
    pub fn with_locked(mut self, position: Position, value: f64, symbol: Option<&str>) -> Self {
        self.locked_positions.push(PositionValue {
            position,
            value,
            symbol: symbol.map(str::to_string),
        });
        self
    }

    /// Builder: tag a position with a value
    pub fn with_position_value(mut self, position: Position, value: f64, symbol: &str) -> Self {
        self.position_values.push(PositionValue {
            position,
            value,
            symbol: Some(symbol.to_string()),
        });
        self
    }

    /// Symbol at a position, if the matrix covers it
    pub fn symbol_at(&self, pos: Position) -> Option<&str> {
        self.matrix
            .get(pos.row)
            .and_then(|row| row.get(pos.col))
            .map(String::as_str)
    }

    /// Every matrix position holding `symbol`
    pub fn positions_of<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = Position> + 'a {
        self.matrix.iter().enumerate().flat_map(move |(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(move |(_, s)| s.as_str() == symbol)
                .map(move |(col, _)| Position::new(row, col))
        })
    }

    /// Special landings of `symbol`
    pub fn landings_of<'a>(
        &'a self,
        symbol: &'a str,
    ) -> impl Iterator<Item = &'a SpecialSymbolLanding> + 'a {
        self.special_symbols.iter().filter(move |s| s.symbol == symbol)
    }

    /// Did this step produce any win?
    pub fn has_win(&self) -> bool {
        self.total_step_win > 0.0 || !self.wins.is_empty()
    }

    /// Number of matrix rows
    pub fn row_count(&self) -> usize {
        self.matrix.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_defaults_from_minimal_json() {
        let step: StepData = serde_json::from_str(r#"{"stepIndex": 3}"#).unwrap();
        assert_eq!(step.step_index, 3);
        assert!(step.special_symbols.is_empty());
        assert!(step.modifiers.is_empty());
        assert!(step.multiplier.is_none());
        assert!(!step.has_win());
    }

    #[test]
    fn test_step_full_json() {
        let json = r#"{
            "stepIndex": 0,
            "stepId": "r1-s0",
            "matrix": [["A", "H"], ["H", "B"]],
            "wins": [{"symbol": "A", "positions": [{"row": 0, "col": 0}], "amount": 4, "matchCount": 3}],
            "totalStepWin": 4,
            "specialSymbols": [{"position": {"row": 0, "col": 1}, "symbolId": "H", "value": 5, "effect": "lock"}],
            "modifiers": [{"type": "addMultiplier", "value": 2}],
            "transformations": [{"position": {"row": 1, "col": 1}, "from": "B", "to": "A"}]
        }"#;
        let step: StepData = serde_json::from_str(json).unwrap();

        assert_eq!(step.wins[0].match_count, 3);
        assert_eq!(step.special_symbols[0].symbol, "H");
        assert_eq!(step.special_symbols[0].effect, Some(LandingEffect::Lock));
        assert_eq!(step.modifiers[0].kind, ModifierKind::AddMultiplier);
        assert_eq!(step.transformations[0].to, "A");
        assert!(step.has_win());
    }

    #[test]
    fn test_unknown_effect_is_tolerated() {
        let json = r#"{"position": {"row": 0, "col": 0}, "symbol": "X", "effect": "sparkle"}"#;
        let landing: SpecialSymbolLanding = serde_json::from_str(json).unwrap();
        assert_eq!(landing.effect, Some(LandingEffect::Other));
        assert_eq!(landing.value, 0.0);
    }

    #[test]
    fn test_matrix_queries() {
        let step = StepData::new(0).with_matrix(vec![vec!["A", "W"], vec!["W", "B"]]);

        assert_eq!(step.symbol_at(Position::new(1, 1)), Some("B"));
        assert_eq!(step.symbol_at(Position::new(5, 5)), None);

        let wilds: Vec<_> = step.positions_of("W").collect();
        assert_eq!(wilds, vec![Position::new(0, 1), Position::new(1, 0)]);
    }
}
