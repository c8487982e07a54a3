use std::borrow::Cow;

/// Swaps the item at `index` with its predecessor. Moving the first item up
/// (or an out-of-range index) hands back the original slice untouched.
pub fn move_up<T: Clone>(list: &[T], index: usize) -> Cow<'_, [T]> {
    if index == 0 || index >= list.len() {
        return Cow::Borrowed(list);
    }
    let mut moved = list.to_vec();
    moved.swap(index - 1, index);
    Cow::Owned(moved)
}

/// Swaps the item at `index` with its successor. Moving the last item down
/// hands back the original slice untouched.
pub fn move_down<T: Clone>(list: &[T], index: usize) -> Cow<'_, [T]> {
    if index + 1 >= list.len() {
        return Cow::Borrowed(list);
    }
    let mut moved = list.to_vec();
    moved.swap(index, index + 1);
    Cow::Owned(moved)
}
