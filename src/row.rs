//! One candidate spectral line as edited in the table.

use std::fmt;
use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::{
    BLEND_PRECISION, CHANNEL_PRECISION, ENERGY_PRECISION, FIT_PRECISION, GROUP_PREFIX,
    LINESTRENGTH_PRECISION, PEAKRMS_PRECISION, VELOCITY_PRECISION,
};
use crate::persist::{KeyValueStore, PersistentField};
use crate::precision::{FormattedValue, RoundedField};
use crate::reactive::{Observable, Subscription};
use crate::scalar::Scalar;
use crate::utils::unique_token;

/// A line record as delivered by the pipeline. Every cell is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineRecord {
    pub frequency: Scalar,
    pub uid: Scalar,
    pub formula: Scalar,
    pub name: Scalar,
    pub transition: Scalar,
    pub velocity: Scalar,
    #[serde(rename = "El")]
    pub elower: Scalar,
    #[serde(rename = "Eu")]
    pub eupper: Scalar,
    pub linestrength: Scalar,
    pub peakintensity: Scalar,
    pub peakoffset: Scalar,
    pub fwhm: Scalar,
    pub startchan: Scalar,
    pub endchan: Scalar,
    pub peakrms: Scalar,
    pub blend: Scalar,
    #[serde(deserialize_with = "deserialize_force_hint")]
    pub force: bool,
}

impl LineRecord {
    /// Record with every cell blank, used for rows added by hand.
    pub fn blank() -> Self {
        Self {
            frequency: Scalar::blank(),
            uid: Scalar::blank(),
            formula: Scalar::blank(),
            name: Scalar::blank(),
            transition: Scalar::blank(),
            velocity: Scalar::blank(),
            elower: Scalar::blank(),
            eupper: Scalar::blank(),
            linestrength: Scalar::blank(),
            peakintensity: Scalar::blank(),
            peakoffset: Scalar::blank(),
            fwhm: Scalar::blank(),
            startchan: Scalar::blank(),
            endchan: Scalar::blank(),
            peakrms: Scalar::blank(),
            blend: Scalar::blank(),
            force: false,
        }
    }
}

/// The pipeline writes the force hint as a Python-style string ("True"/"False").
fn deserialize_force_hint<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Hint {
        Flag(bool),
        Text(String),
        Number(f64),
        Missing(()),
    }

    Ok(match Hint::deserialize(deserializer)? {
        Hint::Flag(b) => b,
        Hint::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        Hint::Number(n) => n != 0.0,
        Hint::Missing(()) => false,
    })
}

/// What the scientist decided for a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    #[default]
    Accept,
    Force,
    Reject,
}

impl Disposition {
    pub const ALL: [Disposition; 3] = [Disposition::Accept, Disposition::Force, Disposition::Reject];

    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Accept => "accept",
            Disposition::Force => "force",
            Disposition::Reject => "reject",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "accept" => Some(Disposition::Accept),
            "force" => Some(Disposition::Force),
            "reject" => Some(Disposition::Reject),
            _ => None,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Serialized form of a row for submission. Numeric fields carry raw values;
/// the `*_raw` duplicates are the keys the processing service reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSnapshot {
    pub frequency: Scalar,
    pub uid: String,
    pub formula: String,
    pub name: String,
    pub transition: String,
    pub velocity: Scalar,
    pub velocity_raw: Scalar,
    pub elower: f64,
    pub eupper: f64,
    pub linestrength: f64,
    pub peakintensity: Scalar,
    pub peakintensity_raw: Scalar,
    pub peakoffset: Scalar,
    pub peakoffset_raw: Scalar,
    pub fwhm: Scalar,
    pub fwhm_raw: Scalar,
    pub startchan: f64,
    pub endchan: f64,
    pub peakrms: f64,
    pub blend: f64,
    pub force: bool,
    pub disposition: Disposition,
    #[serde(rename = "buttonGroup")]
    pub button_group: String,
}

/// One editable line. Rows are never patched in place by the table; a reload
/// builds new rows, so `Rc` identity tells consumers which rows are new.
pub struct LineRow {
    pub ordinal: u64,
    storage_token: String,
    group_token: String,
    pub frequency: Observable<Scalar>,
    pub uid: PersistentField<Observable<String>>,
    pub formula: PersistentField<Observable<String>>,
    pub name: PersistentField<Observable<String>>,
    pub transition: PersistentField<Observable<String>>,
    pub velocity: PersistentField<FormattedValue>,
    pub elower: RoundedField,
    pub eupper: RoundedField,
    pub linestrength: RoundedField,
    pub peakintensity: FormattedValue,
    pub peakoffset: FormattedValue,
    pub fwhm: FormattedValue,
    pub startchan: PersistentField<RoundedField>,
    pub endchan: PersistentField<RoundedField>,
    pub peakrms: RoundedField,
    pub blend: RoundedField,
    pub force: bool,
    pub disposition: PersistentField<Observable<Disposition>>,
}

impl LineRow {
    pub fn new(record: &LineRecord, ordinal: u64, store: Rc<dyn KeyValueStore>) -> Self {
        Self::with_token(record, ordinal, store, unique_token())
    }

    /// Build a row whose persisted fields live under `<field><token>` keys.
    pub fn with_token(
        record: &LineRecord,
        ordinal: u64,
        store: Rc<dyn KeyValueStore>,
        token: String,
    ) -> Self {
        let text = |field: &str, value: &Scalar| {
            PersistentField::wrap(
                Observable::new(value.to_string()),
                format!("{}{}", field, token),
                Rc::clone(&store),
            )
        };
        let initial = if record.force {
            Disposition::Force
        } else {
            Disposition::Accept
        };

        let row = Self {
            ordinal,
            group_token: format!("{}{}", GROUP_PREFIX, ordinal),
            frequency: Observable::new(record.frequency.clone()),
            uid: text("uid", &record.uid),
            formula: text("formula", &record.formula),
            name: text("name", &record.name),
            transition: text("transition", &record.transition),
            velocity: PersistentField::wrap(
                FormattedValue::new(&record.velocity, VELOCITY_PRECISION),
                format!("velocity{}", token),
                Rc::clone(&store),
            ),
            elower: RoundedField::new(&record.elower, ENERGY_PRECISION),
            eupper: RoundedField::new(&record.eupper, ENERGY_PRECISION),
            linestrength: RoundedField::new(&record.linestrength, LINESTRENGTH_PRECISION),
            peakintensity: FormattedValue::new(&record.peakintensity, FIT_PRECISION),
            peakoffset: FormattedValue::new(&record.peakoffset, FIT_PRECISION),
            fwhm: FormattedValue::new(&record.fwhm, FIT_PRECISION),
            startchan: PersistentField::wrap(
                RoundedField::new(&record.startchan, CHANNEL_PRECISION),
                format!("startchan{}", token),
                Rc::clone(&store),
            ),
            endchan: PersistentField::wrap(
                RoundedField::new(&record.endchan, CHANNEL_PRECISION),
                format!("endchan{}", token),
                Rc::clone(&store),
            ),
            peakrms: RoundedField::new(&record.peakrms, PEAKRMS_PRECISION),
            blend: RoundedField::new(&record.blend, BLEND_PRECISION),
            force: record.force,
            disposition: PersistentField::wrap(
                Observable::new(initial),
                format!("disposition{}", token),
                Rc::clone(&store),
            ),
            storage_token: token,
        };
        debug!(
            "Built row {} (uid '{}', {})",
            row.ordinal,
            row.uid.get(),
            row.disposition()
        );
        row
    }

    pub fn storage_token(&self) -> &str {
        &self.storage_token
    }

    /// Radio group name shared by this row's accept/force/reject buttons.
    pub fn group_token(&self) -> &str {
        &self.group_token
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition.get()
    }

    /// Any disposition may follow any other.
    pub fn set_disposition(&self, disposition: Disposition) {
        self.disposition.set(disposition);
    }

    pub fn is_forced(&self) -> bool {
        self.disposition() == Disposition::Force
    }

    pub fn is_rejected(&self) -> bool {
        self.disposition() == Disposition::Reject
    }

    pub fn is_accepted(&self) -> bool {
        self.disposition() == Disposition::Accept
    }

    /// Channel range ordered low to high.
    pub fn channel_range(&self) -> (f64, f64) {
        let (a, b) = (self.startchan.get(), self.endchan.get());
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn snapshot(&self) -> RowSnapshot {
        let velocity = self.velocity.read_raw();
        let peakintensity = self.peakintensity.read_raw();
        let peakoffset = self.peakoffset.read_raw();
        let fwhm = self.fwhm.read_raw();
        RowSnapshot {
            frequency: self.frequency.get(),
            uid: self.uid.get(),
            formula: self.formula.get(),
            name: self.name.get(),
            transition: self.transition.get(),
            velocity_raw: velocity.clone(),
            velocity,
            elower: self.elower.get(),
            eupper: self.eupper.get(),
            linestrength: self.linestrength.get(),
            peakintensity_raw: peakintensity.clone(),
            peakintensity,
            peakoffset_raw: peakoffset.clone(),
            peakoffset,
            fwhm_raw: fwhm.clone(),
            fwhm,
            startchan: self.startchan.get(),
            endchan: self.endchan.get(),
            peakrms: self.peakrms.get(),
            blend: self.blend.get(),
            force: self.force,
            disposition: self.disposition(),
            button_group: self.group_token.clone(),
        }
    }

    /// Display text for a table column, keyed by the pipeline's column name.
    pub fn cell_text(&self, column: &str) -> Option<String> {
        let text = match column {
            "frequency" => self.frequency.get().to_string(),
            "uid" => self.uid.get(),
            "formula" => self.formula.get(),
            "name" => self.name.get(),
            "transition" => self.transition.get(),
            "velocity" => self.velocity.read(),
            "El" => self.elower.read(),
            "Eu" => self.eupper.read(),
            "linestrength" => self.linestrength.read(),
            "peakintensity" => self.peakintensity.read(),
            "peakoffset" => self.peakoffset.read(),
            "fwhm" => self.fwhm.read(),
            "startchan" => self.startchan.read(),
            "endchan" => self.endchan.read(),
            "peakrms" => self.peakrms.read(),
            "blend" => self.blend.read(),
            "force" => if self.force { "True" } else { "False" }.to_string(),
            _ => return None,
        };
        Some(text)
    }

    /// Write user input into the field behind `column`. Returns false for
    /// columns that are not editable.
    pub fn edit_cell(&self, column: &str, input: &str) -> bool {
        match column {
            "uid" => self.uid.set(input.to_string()),
            "formula" => self.formula.set(input.to_string()),
            "name" => self.name.set(input.to_string()),
            "transition" => self.transition.set(input.to_string()),
            "velocity" => self.velocity.set(Scalar::from(input)),
            "startchan" => self.startchan.set(Scalar::from(input)),
            "endchan" => self.endchan.set(Scalar::from(input)),
            _ => return false,
        }
        true
    }

    /// Run `callback` whenever any field of the row is written.
    pub fn subscribe_all(&self, callback: impl Fn() + 'static) -> Vec<Subscription> {
        let callback: Rc<dyn Fn()> = Rc::new(callback);
        let mut subs = Vec::new();
        macro_rules! watch {
            ($($field:expr),* $(,)?) => {
                $({
                    let cb = Rc::clone(&callback);
                    subs.push($field.subscribe(move |_| cb()));
                })*
            };
        }
        watch!(
            self.frequency,
            self.uid,
            self.formula,
            self.name,
            self.transition,
            self.velocity,
            self.elower,
            self.eupper,
            self.linestrength,
            self.peakintensity,
            self.peakoffset,
            self.fwhm,
            self.startchan,
            self.endchan,
            self.peakrms,
            self.blend,
            self.disposition,
        );
        subs
    }
}

impl fmt::Debug for LineRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineRow")
            .field("ordinal", &self.ordinal)
            .field("uid", &self.uid.get())
            .field("disposition", &self.disposition())
            .field("storage_token", &self.storage_token)
            .finish()
    }
}
