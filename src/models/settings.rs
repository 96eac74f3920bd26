use serde::{Deserialize, Serialize};

/// Store-wide settings. At most one record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub store_name: String,
    pub store_slogan: String,
    pub whatsapp_number: String,
    pub instagram: String,
    pub email: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_name: "Madame Modas".to_string(),
            store_slogan: "Moda Feminina & Fitness".to_string(),
            whatsapp_number: "5500000000000".to_string(),
            instagram: "@madamemodas".to_string(),
            email: "contato@madamemodas.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub store_name: Option<String>,
    pub store_slogan: Option<String>,
    pub whatsapp_number: Option<String>,
    pub instagram: Option<String>,
    pub email: Option<String>,
}

impl Settings {
    pub fn merge(&mut self, patch: SettingsPatch) {
        let SettingsPatch { store_name, store_slogan, whatsapp_number, instagram, email } = patch;
        if let Some(v) = store_name {
            self.store_name = v;
        }
        if let Some(v) = store_slogan {
            self.store_slogan = v;
        }
        if let Some(v) = whatsapp_number {
            self.whatsapp_number = v;
        }
        if let Some(v) = instagram {
            self.instagram = v;
        }
        if let Some(v) = email {
            self.email = v;
        }
    }
}
