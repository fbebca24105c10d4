//! Numeric fields with a presentation precision.
//!
//! Two flavours exist because the table needs both:
//!
//! - [`FormattedValue`] keeps the raw value untouched and only rounds when
//!   rendering, so fitted quantities (velocity, intensity, offset, width)
//!   round-trip to the server at full precision.
//! - [`RoundedField`] normalizes the stored value itself to `precision`
//!   digits. Used for quantities where extra digits carry no meaning
//!   (energies, channels, blend index).
//!
//! Both notify subscribers on every write: two inputs that differ in raw form
//! may render identically, and the input widget still has to be refreshed.

use crate::persist::Field;
use crate::reactive::{Notify, Observable, Subscription};
use crate::scalar::Scalar;
use crate::utils::{format_fixed, number_to_text, round_to};

/// Raw value with a fixed-precision display.
#[derive(Clone, Debug)]
pub struct FormattedValue {
    raw: Observable<Scalar>,
    precision: u32,
}

impl FormattedValue {
    /// Start from the numeric coercion of `initial` (blank becomes 0).
    pub fn new(initial: &Scalar, precision: u32) -> Self {
        Self {
            raw: Observable::with_policy(Scalar::Number(initial.to_number()), Notify::Always),
            precision,
        }
    }

    /// Display text at the configured precision.
    ///
    /// A raw value that never parsed as a number is shown verbatim.
    pub fn read(&self) -> String {
        self.raw.with(|raw| match raw {
            Scalar::Number(v) => format_fixed(*v, self.precision),
            Scalar::Text(s) => s.clone(),
            Scalar::Empty => String::new(),
        })
    }

    pub fn read_raw(&self) -> Scalar {
        self.raw.get()
    }

    /// Store the parsed number, or the input itself if nothing parses.
    pub fn write(&self, input: impl Into<Scalar>) {
        let input = input.into();
        let value = match input.parse_lenient() {
            Some(v) => Scalar::Number(v),
            None => input,
        };
        self.raw.set(value);
    }

    pub fn subscribe(&self, callback: impl Fn(&Scalar) + 'static) -> Subscription {
        self.raw.subscribe(callback)
    }
}

impl Field for FormattedValue {
    type Input = Scalar;

    fn current_input(&self) -> Scalar {
        self.read_raw()
    }

    fn set(&self, input: Scalar) {
        self.write(input);
    }
}

/// Numeric field whose stored value is always rounded to `precision` digits.
#[derive(Clone, Debug)]
pub struct RoundedField {
    value: Observable<f64>,
    precision: u32,
}

impl RoundedField {
    pub fn new(initial: &Scalar, precision: u32) -> Self {
        let field = Self {
            value: Observable::with_policy(0.0, Notify::Always),
            precision,
        };
        field.write(initial.clone());
        field
    }

    pub fn get(&self) -> f64 {
        self.value.get()
    }

    pub fn read(&self) -> String {
        number_to_text(self.get())
    }

    /// Non-numeric input is treated as 0.
    pub fn write(&self, input: impl Into<Scalar>) {
        let mut number = input.into().to_number();
        if number.is_nan() {
            number = 0.0;
        }
        self.value.set(round_to(number, self.precision));
    }

    pub fn subscribe(&self, callback: impl Fn(&f64) + 'static) -> Subscription {
        self.value.subscribe(callback)
    }
}

impl Field for RoundedField {
    type Input = Scalar;

    fn current_input(&self) -> Scalar {
        Scalar::Number(self.get())
    }

    fn set(&self, input: Scalar) {
        self.write(input);
    }
}
