//! Viewport scrolling for the item list.

/// Compute the first visible row so that `cursor` stays inside the viewport
/// with `margin` rows of context.
///
/// Everything fits when `count < view_size`, so the offset is `0`. Otherwise
/// the cursor may sit between rows `margin - 1` and `view_size - margin` of
/// the viewport; past either edge the window follows it, clamped to
/// `0..=count - view_size`. The margin is capped at half the viewport.
///
/// `offset` may be anything, including negative or past the end: it is
/// brought back into range in the same call.
pub fn adjust_offset(
  offset: isize,
  cursor: usize,
  count: usize,
  view_size: usize,
  margin: usize,
) -> usize {
  if view_size == 0 || count < view_size {
    return 0;
  }
  let max_offset = (count - view_size) as isize;
  let view = view_size as isize;
  let margin = margin.clamp(1, view_size.div_ceil(2)) as isize;
  let cursor = cursor.min(count - 1) as isize;

  let mut offset = offset.clamp(0, max_offset);
  let lowest = view - margin;
  let highest = margin - 1;
  if cursor - offset > lowest {
    offset = cursor - lowest;
  } else if cursor - offset < highest {
    offset = cursor - highest;
  }
  offset.clamp(0, max_offset) as usize
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sweeping_down_scrolls_with_margin() {
    let mut offset = 0;
    let offsets: Vec<_> = (0..10)
      .map(|cursor| {
        offset = adjust_offset(offset as isize, cursor, 10, 5, 2);
        offset
      })
      .collect();
    assert_eq!(offsets, vec![0, 0, 0, 0, 1, 2, 3, 4, 5, 5]);
  }

  #[test]
  fn sweeping_up_mirrors_sweeping_down() {
    let mut offset = 5;
    let offsets: Vec<_> = (0..10)
      .rev()
      .map(|cursor| {
        offset = adjust_offset(offset as isize, cursor, 10, 5, 2);
        offset
      })
      .collect();
    assert_eq!(offsets, vec![5, 5, 5, 5, 4, 3, 2, 1, 0, 0]);
  }

  #[test]
  fn short_lists_never_scroll() {
    for cursor in 0..4 {
      for offset in [-3, 0, 2, 100] {
        assert_eq!(adjust_offset(offset, cursor, 4, 5, 2), 0);
      }
    }
    assert_eq!(adjust_offset(7, 0, 0, 5, 2), 0);
  }

  #[test]
  fn out_of_range_offset_is_corrected() {
    assert_eq!(adjust_offset(-1, 0, 10, 5, 2), 0);
    assert_eq!(adjust_offset(10, 0, 10, 5, 2), 0);
    assert_eq!(adjust_offset(10, 9, 10, 5, 2), 5);
    assert_eq!(adjust_offset(-4, 6, 10, 5, 2), 3);
  }

  #[test]
  fn oversized_margin_centers_cursor() {
    assert_eq!(adjust_offset(0, 5, 20, 5, 10), 3);
    assert_eq!(adjust_offset(0, 0, 20, 5, 10), 0);
  }

  quickcheck::quickcheck! {
      fn cursor_is_always_visible(offset: i16, cursor: u8, count: u8, view: u8, margin: u8) -> bool {
          let count = usize::from(count);
          let view = usize::from(view);
          let cursor = usize::from(cursor) % count.max(1);
          let offset = adjust_offset(isize::from(offset), cursor, count, view, usize::from(margin));
          if view == 0 || count < view {
              offset == 0
          } else {
              offset <= cursor && cursor < offset + view && offset + view <= count
          }
      }
  }
}
