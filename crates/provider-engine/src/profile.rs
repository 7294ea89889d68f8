use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProviderId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
	pub id: ProviderId,
	pub name: String,
	pub phone: String,
	pub is_online: bool,
}

/// Fields to change on a [`ProviderProfile`], `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
	pub name: Option<String>,
	pub phone: Option<String>,
}

impl ProviderProfile {
	pub(crate) fn apply(&mut self, update: ProfileUpdate) {
		let ProfileUpdate { name, phone } = update;

		if let Some(name) = name {
			self.name = name;
		}

		if let Some(phone) = phone {
			self.phone = phone;
		}
	}
}
