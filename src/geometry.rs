//! Device geometry tables for Contour Shuttle hardware
//!
//! Maps button indices and the two encoders onto a (column, row) control grid.
//! The jog and shuttle encoders sit in the same row on every model, with a
//! third "repeat" cell next to the shuttle that carries the self-repeating
//! shuttle rotations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Grid cell as `[column, row]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub column: u8,
    pub row: u8,
}

const fn cell(column: u8, row: u8) -> Cell {
    Cell { column, row }
}

/// Opaque identifier of one logical control on the surface
///
/// Packed as `row << 8 | column`, so equal cells always produce equal ids
/// and distinct cells never alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionId(u16);

impl PositionId {
    pub const fn from_xy(column: u8, row: u8) -> Self {
        Self(((row as u16) << 8) | column as u16)
    }

    pub const fn column(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn row(self) -> u8 {
        (self.0 >> 8) as u8
    }
}

impl From<Cell> for PositionId {
    fn from(cell: Cell) -> Self {
        Self::from_xy(cell.column, cell.row)
    }
}

impl fmt::Display for PositionId {
    /// Renders as `row/column`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.row(), self.column())
    }
}

/// What a declared grid cell is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Button(usize),
    Jog,
    Shuttle,
    ShuttleRepeat,
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Button(index) => write!(f, "button {}", index),
            Self::Jog => f.write_str("jog"),
            Self::Shuttle => f.write_str("shuttle"),
            Self::ShuttleRepeat => f.write_str("shuttle repeat"),
        }
    }
}

/// Geometry table inconsistencies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("{second} shares cell {position} with {first}")]
    DuplicateCell {
        position: PositionId,
        first: ControlKind,
        second: ControlKind,
    },

    #[error("{kind} at [{column}, {row}] lies outside the {columns}x{rows} grid")]
    OutOfBounds {
        kind: ControlKind,
        column: u8,
        row: u8,
        columns: u8,
        rows: u8,
    },
}

/// Static control layout of one hardware variant
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceGeometry {
    pub columns: u8,
    pub rows: u8,
    pub jog: Cell,
    pub shuttle: Cell,
    pub shuttle_repeat: Cell,
    /// Button index → cell, in device report order
    pub buttons: &'static [Cell],
}

impl DeviceGeometry {
    /// Resolve a raw button index, `None` for buttons the table doesn't know
    pub fn button_position(&self, index: usize) -> Option<PositionId> {
        self.buttons.get(index).copied().map(PositionId::from)
    }

    pub fn jog_position(&self) -> PositionId {
        self.jog.into()
    }

    pub fn shuttle_position(&self) -> PositionId {
        self.shuttle.into()
    }

    pub fn shuttle_repeat_position(&self) -> PositionId {
        self.shuttle_repeat.into()
    }

    /// Every declared control: buttons first, then jog, shuttle and repeat
    pub fn controls(&self) -> impl Iterator<Item = (ControlKind, Cell)> + '_ {
        self.buttons
            .iter()
            .enumerate()
            .map(|(index, cell)| (ControlKind::Button(index), *cell))
            .chain([
                (ControlKind::Jog, self.jog),
                (ControlKind::Shuttle, self.shuttle),
                (ControlKind::ShuttleRepeat, self.shuttle_repeat),
            ])
    }

    /// Check that every control is inside the grid and no two share a cell
    pub fn validate(&self) -> Result<(), GeometryError> {
        let mut seen: BTreeMap<PositionId, ControlKind> = BTreeMap::new();

        for (kind, cell) in self.controls() {
            if cell.column >= self.columns || cell.row >= self.rows {
                return Err(GeometryError::OutOfBounds {
                    kind,
                    column: cell.column,
                    row: cell.row,
                    columns: self.columns,
                    rows: self.rows,
                });
            }

            let position = PositionId::from(cell);
            if let Some(first) = seen.insert(position, kind) {
                return Err(GeometryError::DuplicateCell {
                    position,
                    first,
                    second: kind,
                });
            }
        }

        Ok(())
    }

    /// Surface layout description for a host UI
    pub fn layout(&self) -> SurfaceLayout {
        let controls = self
            .controls()
            .map(|(_, cell)| {
                (
                    PositionId::from(cell).to_string(),
                    LayoutCell {
                        row: cell.row,
                        column: cell.column,
                    },
                )
            })
            .collect();

        SurfaceLayout {
            columns: self.columns,
            rows: self.rows,
            controls,
        }
    }
}

/// Serializable grid layout, keyed by position id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurfaceLayout {
    pub columns: u8,
    pub rows: u8,
    pub controls: BTreeMap<String, LayoutCell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutCell {
    pub row: u8,
    pub column: u8,
}

// Button, jog, shuttle, button on the lower row. The encoders share the
// column placement used on the Pro models.
static SHUTTLE_XPRESS: DeviceGeometry = DeviceGeometry {
    columns: 4,
    rows: 2,
    jog: cell(1, 1),
    shuttle: cell(2, 1),
    shuttle_repeat: cell(3, 1),
    buttons: &[cell(0, 1), cell(0, 0), cell(1, 0), cell(2, 0), cell(3, 0)],
};

// Pro V2 without the two buttons either side of the encoders
static SHUTTLE_PRO_V1: DeviceGeometry = DeviceGeometry {
    columns: 5,
    rows: 4,
    jog: cell(1, 2),
    shuttle: cell(2, 2),
    shuttle_repeat: cell(3, 2),
    buttons: &[
        // 4 buttons
        cell(0, 0),
        cell(1, 0),
        cell(2, 0),
        cell(3, 0),
        // 5 buttons
        cell(0, 1),
        cell(1, 1),
        cell(2, 1),
        cell(3, 1),
        cell(4, 1),
        // outer pair of the bottom row
        cell(0, 3),
        cell(3, 3),
        // inner pair
        cell(1, 3),
        cell(2, 3),
    ],
};

static SHUTTLE_PRO_V2: DeviceGeometry = DeviceGeometry {
    columns: 5,
    rows: 4,
    jog: cell(1, 2),
    shuttle: cell(2, 2),
    shuttle_repeat: cell(3, 2),
    buttons: &[
        cell(0, 0),
        cell(1, 0),
        cell(2, 0),
        cell(3, 0),
        cell(0, 1),
        cell(1, 1),
        cell(2, 1),
        cell(3, 1),
        cell(4, 1),
        cell(0, 3),
        cell(3, 3),
        cell(1, 3),
        cell(2, 3),
        // either side of the encoders; the right one sits past the repeat cell
        cell(0, 2),
        cell(4, 2),
    ],
};

/// Known Contour Shuttle product models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShuttleModel {
    ShuttleXpress,
    ShuttleProV1,
    ShuttleProV1a,
    ShuttleProV2,
}

impl ShuttleModel {
    pub const ALL: [ShuttleModel; 4] = [
        Self::ShuttleXpress,
        Self::ShuttleProV1,
        Self::ShuttleProV1a,
        Self::ShuttleProV2,
    ];

    pub fn geometry(self) -> &'static DeviceGeometry {
        match self {
            Self::ShuttleXpress => &SHUTTLE_XPRESS,
            Self::ShuttleProV1 | Self::ShuttleProV1a => &SHUTTLE_PRO_V1,
            Self::ShuttleProV2 => &SHUTTLE_PRO_V2,
        }
    }

    pub fn product_name(self) -> &'static str {
        match self {
            Self::ShuttleXpress => "ShuttleXpress",
            Self::ShuttleProV1 => "ShuttlePro v1",
            Self::ShuttleProV1a => "ShuttlePro v1a",
            Self::ShuttleProV2 => "ShuttlePro v2",
        }
    }

    fn config_name(self) -> &'static str {
        match self {
            Self::ShuttleXpress => "shuttle-xpress",
            Self::ShuttleProV1 => "shuttle-pro-v1",
            Self::ShuttleProV1a => "shuttle-pro-v1a",
            Self::ShuttleProV2 => "shuttle-pro-v2",
        }
    }
}

impl fmt::Display for ShuttleModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

impl FromStr for ShuttleModel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|model| model.config_name() == wanted)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown Contour Shuttle model '{}' (expected one of: {})",
                    s,
                    Self::ALL.map(|m| m.config_name()).join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_id_is_structural() {
        assert_eq!(PositionId::from_xy(2, 1), PositionId::from_xy(2, 1));
        assert_ne!(PositionId::from_xy(2, 1), PositionId::from_xy(1, 2));
        assert_eq!(PositionId::from(cell(3, 2)), PositionId::from_xy(3, 2));
    }

    #[test]
    fn test_position_id_display_is_row_then_column() {
        let id = PositionId::from_xy(4, 2);
        assert_eq!(id.to_string(), "2/4");
        assert_eq!(id.column(), 4);
        assert_eq!(id.row(), 2);
    }

    #[test]
    fn test_position_ids_never_alias() {
        let mut ids = std::collections::HashSet::new();
        for row in 0..=u8::MAX {
            for column in 0..=u8::MAX {
                assert!(ids.insert(PositionId::from_xy(column, row)));
            }
        }
    }

    #[test]
    fn test_all_geometries_are_collision_free() {
        for model in ShuttleModel::ALL {
            assert_eq!(model.geometry().validate(), Ok(()), "{}", model);
        }
    }

    #[test]
    fn test_button_counts() {
        assert_eq!(ShuttleModel::ShuttleXpress.geometry().buttons.len(), 5);
        assert_eq!(ShuttleModel::ShuttleProV1.geometry().buttons.len(), 13);
        assert_eq!(ShuttleModel::ShuttleProV2.geometry().buttons.len(), 15);
    }

    #[test]
    fn test_v1_variants_share_geometry() {
        assert!(std::ptr::eq(
            ShuttleModel::ShuttleProV1.geometry(),
            ShuttleModel::ShuttleProV1a.geometry()
        ));
    }

    #[test]
    fn test_button_lookup() {
        let geometry = ShuttleModel::ShuttleProV2.geometry();

        assert_eq!(geometry.button_position(0), Some(PositionId::from_xy(0, 0)));
        assert_eq!(geometry.button_position(8), Some(PositionId::from_xy(4, 1)));
        assert_eq!(geometry.button_position(14), Some(PositionId::from_xy(4, 2)));

        // Unknown buttons are absent, not an error
        assert_eq!(geometry.button_position(15), None);
        assert_eq!(ShuttleModel::ShuttleProV1.geometry().button_position(13), None);
    }

    #[test]
    fn test_encoder_positions() {
        let geometry = ShuttleModel::ShuttleXpress.geometry();
        assert_eq!(geometry.jog_position().to_string(), "1/1");
        assert_eq!(geometry.shuttle_position().to_string(), "1/2");
        assert_eq!(geometry.shuttle_repeat_position().to_string(), "1/3");
    }

    #[test]
    fn test_validate_reports_duplicate() {
        static BROKEN: DeviceGeometry = DeviceGeometry {
            columns: 4,
            rows: 2,
            jog: cell(1, 1),
            shuttle: cell(2, 1),
            shuttle_repeat: cell(3, 1),
            buttons: &[cell(0, 0), cell(3, 1)],
        };

        assert_eq!(
            BROKEN.validate(),
            Err(GeometryError::DuplicateCell {
                position: PositionId::from_xy(3, 1),
                first: ControlKind::Button(1),
                second: ControlKind::ShuttleRepeat,
            })
        );
    }

    #[test]
    fn test_validate_reports_out_of_bounds() {
        static BROKEN: DeviceGeometry = DeviceGeometry {
            columns: 2,
            rows: 2,
            jog: cell(0, 1),
            shuttle: cell(1, 1),
            shuttle_repeat: cell(2, 1),
            buttons: &[],
        };

        assert!(matches!(
            BROKEN.validate(),
            Err(GeometryError::OutOfBounds {
                kind: ControlKind::ShuttleRepeat,
                ..
            })
        ));
    }

    #[test]
    fn test_layout_lists_every_control() {
        let layout = ShuttleModel::ShuttleProV2.geometry().layout();
        assert_eq!(layout.columns, 5);
        assert_eq!(layout.rows, 4);
        assert_eq!(layout.controls.len(), 15 + 3);
        assert_eq!(layout.controls["2/3"], LayoutCell { row: 2, column: 3 });

        let json = serde_json::to_value(&layout).unwrap();
        assert_eq!(json["controls"]["0/0"]["column"], 0);
    }

    #[test]
    fn test_model_parse() {
        assert_eq!(
            "shuttle-pro-v2".parse::<ShuttleModel>().unwrap(),
            ShuttleModel::ShuttleProV2
        );
        assert_eq!(
            " Shuttle-Xpress ".parse::<ShuttleModel>().unwrap(),
            ShuttleModel::ShuttleXpress
        );
        assert!("shuttle-pro-v3".parse::<ShuttleModel>().is_err());

        for model in ShuttleModel::ALL {
            assert_eq!(model.to_string().parse::<ShuttleModel>().unwrap(), model);
        }
    }
}
