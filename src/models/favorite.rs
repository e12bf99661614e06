use serde::{Deserialize, Serialize};

use super::booking::ShopRef;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: String,
    #[serde(default)]
    pub barber_shop: Option<ShopRef>,
}
