use std::rc::Rc;

use lineid_editor::{LineRow, Observable};
use yew::prelude::*;

/// Re-render the calling component whenever `observable` notifies, and return
/// its current value.
#[hook]
pub fn use_observable<T: Clone + PartialEq + 'static>(observable: &Observable<T>) -> T {
    let trigger = use_force_update();
    {
        let observable = observable.clone();
        // Re-subscribe only if the component is handed a different cell.
        use_effect_with(observable.id(), move |_| {
            let subscription = observable.subscribe(move |_| trigger.force_update());
            move || drop(subscription)
        });
    }
    observable.get()
}

/// Re-render the calling component when any field of `row` is written.
#[hook]
pub fn use_row_changes(row: &Rc<LineRow>) {
    let trigger = use_force_update();
    let row = Rc::clone(row);
    use_effect_with(row.ordinal, move |_| {
        let subscriptions = row.subscribe_all(move || trigger.force_update());
        move || drop(subscriptions)
    });
}
