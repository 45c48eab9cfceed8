//! Host layout constants used by the surfaces

use crate::gamedata::{Gamedata, GamedataError};
use crate::memory::ArrayLayout;

/// Offsets and field indices for the running host build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostLayout {
    pub strings: ArrayLayout,
    pub numbers: ArrayLayout,
    pub item_id_offset: usize,
    pub glamour_id_offset: usize,
    /// Number array index probed for an entity id
    pub id_probe: usize,
    pub item_name_field: usize,
    pub glamour_name_field: usize,
    pub item_description_field: usize,
    pub action_name_field: usize,
    pub action_description_field: usize,
}

impl HostLayout {
    pub fn from_gamedata(gamedata: &Gamedata) -> Result<Self, GamedataError> {
        Ok(Self {
            strings: ArrayLayout::strings(gamedata)?,
            numbers: ArrayLayout::numbers(gamedata)?,
            item_id_offset: gamedata.get_usize("InventoryItem.ItemId")?,
            glamour_id_offset: gamedata.get_usize("InventoryItem.GlamourId")?,
            id_probe: gamedata.get_usize("Tooltip.IdProbe")?,
            item_name_field: gamedata.get_usize("ItemDetail.NameField")?,
            glamour_name_field: gamedata.get_usize("ItemDetail.GlamourNameField")?,
            item_description_field: gamedata.get_usize("ItemDetail.DescriptionField")?,
            action_name_field: gamedata.get_usize("ActionDetail.NameField")?,
            action_description_field: gamedata.get_usize("ActionDetail.DescriptionField")?,
        })
    }
}
