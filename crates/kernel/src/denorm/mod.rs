//! Streaming row denormalization.
//!
//! Rebuilds nested aggregates from one ordered cursor of flat joined rows.
//! Rows sharing a parent key must arrive contiguously (the listing query's
//! ORDER BY guarantees this); the open aggregate is sealed and emitted as soon
//! as the key changes, and the last one is flushed when the stream ends.
//!
//! The precondition is not checked at runtime. Interleaved input silently
//! produces split aggregates.

mod children;

pub use children::Children;

use std::fmt;
use std::marker::PhantomData;

use futures_core::Stream;
use tokio_stream::StreamExt;

/// How one resource's flat rows fold into its response aggregate.
pub trait AggregateShape {
    /// One flat joined row.
    type Row;

    /// Parent key; rows with equal keys belong to the same aggregate.
    type Key: PartialEq + fmt::Debug;

    /// In-flight aggregate state while its group is open.
    type Shell;

    /// Sealed aggregate.
    type Output;

    fn key(&self, row: &Self::Row) -> Self::Key;

    /// Start a new aggregate from the first row of its group.
    fn open(&self, row: &Self::Row) -> Self::Shell;

    /// Fold a row (including the first) into the open aggregate.
    fn absorb(&self, shell: &mut Self::Shell, row: Self::Row);

    /// Finalize. Called exactly once per group, after its last row.
    fn seal(&self, shell: Self::Shell) -> Self::Output;
}

/// Push-based grouping state machine.
pub struct Denormalizer<S: AggregateShape> {
    shape: S,
    current: Option<(S::Key, S::Shell)>,
}

impl<S: AggregateShape> Denormalizer<S> {
    pub fn new(shape: S) -> Self {
        Self {
            shape,
            current: None,
        }
    }

    /// Feed one row. Returns the previous aggregate if this row started a
    /// new group.
    pub fn push(&mut self, row: S::Row) -> Option<S::Output> {
        let key = self.shape.key(&row);

        let same_group = matches!(&self.current, Some((current, _)) if *current == key);
        let sealed = if same_group {
            None
        } else {
            self.current.take().map(|(_, shell)| self.shape.seal(shell))
        };

        let (_, shell) = self
            .current
            .get_or_insert_with(|| (key, self.shape.open(&row)));
        self.shape.absorb(shell, row);

        sealed
    }

    /// Seal and return the in-flight aggregate, if any.
    pub fn finish(&mut self) -> Option<S::Output> {
        self.current.take().map(|(_, shell)| self.shape.seal(shell))
    }
}

/// Lazy iterator adapter over already-decoded rows.
pub struct Denormalized<S: AggregateShape, I> {
    rows: I,
    inner: Denormalizer<S>,
    exhausted: bool,
}

impl<S, I> Iterator for Denormalized<S, I>
where
    S: AggregateShape,
    I: Iterator<Item = S::Row>,
{
    type Item = S::Output;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        for row in self.rows.by_ref() {
            if let Some(aggregate) = self.inner.push(row) {
                return Some(aggregate);
            }
        }
        self.exhausted = true;
        self.inner.finish()
    }
}

/// Group an iterator of rows into aggregates.
pub fn denormalize_iter<S, I>(shape: S, rows: I) -> Denormalized<S, I::IntoIter>
where
    S: AggregateShape,
    I: IntoIterator<Item = S::Row>,
{
    Denormalized {
        rows: rows.into_iter(),
        inner: Denormalizer::new(shape),
        exhausted: false,
    }
}

/// Group a fallible row stream into a stream of aggregates.
///
/// The first error ends the stream; the open aggregate is discarded.
pub fn denormalize<S, St, E>(shape: S, rows: St) -> impl Stream<Item = Result<S::Output, E>>
where
    S: AggregateShape,
    St: Stream<Item = Result<S::Row, E>>,
{
    async_stream::try_stream! {
        let mut rows = std::pin::pin!(rows);
        let mut denormalizer = Denormalizer::new(shape);
        while let Some(row) = rows.next().await {
            if let Some(aggregate) = denormalizer.push(row?) {
                yield aggregate;
            }
        }
        if let Some(aggregate) = denormalizer.finish() {
            yield aggregate;
        }
    }
}

/// Drain a fallible row stream into sealed aggregates. All or nothing: any
/// row error discards everything built so far.
pub async fn collect_aggregates<S, St, E>(shape: S, rows: St) -> Result<Vec<S::Output>, E>
where
    S: AggregateShape,
    St: Stream<Item = Result<S::Row, E>>,
{
    let mut aggregates = std::pin::pin!(denormalize(shape, rows));
    let mut out = Vec::new();
    while let Some(aggregate) = aggregates.next().await {
        out.push(aggregate?);
    }
    Ok(out)
}

/// An [`AggregateShape`] assembled from closures.
pub struct FnShape<R, Key, Sh, Out, K, O, A, Z> {
    key: K,
    open: O,
    absorb: A,
    seal: Z,
    _types: PhantomData<fn(R) -> (Key, Sh, Out)>,
}

/// Build a shape from key-extraction, open, child-append and seal closures.
pub fn shape_fn<R, Key, Sh, Out, K, O, A, Z>(
    key: K,
    open: O,
    absorb: A,
    seal: Z,
) -> FnShape<R, Key, Sh, Out, K, O, A, Z>
where
    Key: PartialEq + fmt::Debug,
    K: Fn(&R) -> Key,
    O: Fn(&R) -> Sh,
    A: Fn(&mut Sh, R),
    Z: Fn(Sh) -> Out,
{
    FnShape {
        key,
        open,
        absorb,
        seal,
        _types: PhantomData,
    }
}

impl<R, Key, Sh, Out, K, O, A, Z> AggregateShape for FnShape<R, Key, Sh, Out, K, O, A, Z>
where
    Key: PartialEq + fmt::Debug,
    K: Fn(&R) -> Key,
    O: Fn(&R) -> Sh,
    A: Fn(&mut Sh, R),
    Z: Fn(Sh) -> Out,
{
    type Row = R;
    type Key = Key;
    type Shell = Sh;
    type Output = Out;

    fn key(&self, row: &R) -> Key {
        (self.key)(row)
    }

    fn open(&self, row: &R) -> Sh {
        (self.open)(row)
    }

    fn absorb(&self, shell: &mut Sh, row: R) {
        (self.absorb)(shell, row);
    }

    fn seal(&self, shell: Sh) -> Out {
        (self.seal)(shell)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    /// `(parent_id, child_id)` with `None` standing in for a LEFT JOIN miss.
    type TwoLevelRow = (i64, Option<i64>);

    #[derive(Debug, PartialEq)]
    struct Parent {
        id: i64,
        children: Vec<i64>,
    }

    fn two_level() -> impl AggregateShape<Row = TwoLevelRow, Output = Parent> {
        shape_fn(
            |row: &TwoLevelRow| row.0,
            |row: &TwoLevelRow| (row.0, Children::<i64, i64>::new()),
            |shell: &mut (i64, Children<i64, i64>), row: TwoLevelRow| {
                shell.1.upsert_last(row.1, || row.1.unwrap_or_default());
            },
            |(id, children): (i64, Children<i64, i64>)| Parent {
                id,
                children: children.into_vec(),
            },
        )
    }

    #[test]
    fn groups_consecutive_parent_keys() {
        let rows = [1, 1, 1, 2, 2, 3]
            .into_iter()
            .enumerate()
            .map(|(i, parent)| (parent, Some(i as i64 + 100)));
        let parents: Vec<Parent> = denormalize_iter(two_level(), rows).collect();

        assert_eq!(
            parents.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            parents.iter().map(|p| p.children.len()).collect::<Vec<_>>(),
            vec![3, 2, 1]
        );
    }

    #[test]
    fn left_join_miss_yields_empty_children() {
        let rows = vec![(1, Some(10)), (2, None), (3, Some(30))];
        let parents: Vec<Parent> = denormalize_iter(two_level(), rows).collect();
        assert_eq!(
            parents,
            vec![
                Parent { id: 1, children: vec![10] },
                Parent { id: 2, children: vec![] },
                Parent { id: 3, children: vec![30] },
            ]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        let parents: Vec<Parent> = denormalize_iter(two_level(), Vec::new()).collect();
        assert!(parents.is_empty());
    }

    #[test]
    fn iterator_is_lazy_and_fused() {
        let rows = vec![(1, Some(1)), (2, Some(2))];
        let mut iter = denormalize_iter(two_level(), rows);
        assert_eq!(iter.next().map(|p| p.id), Some(1));
        assert_eq!(iter.next().map(|p| p.id), Some(2));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn push_emits_on_key_change_only() {
        let mut denormalizer = Denormalizer::new(two_level());
        assert!(denormalizer.push((1, Some(1))).is_none());
        assert!(denormalizer.push((1, Some(2))).is_none());
        let sealed = denormalizer.push((2, Some(3)));
        assert_eq!(sealed, Some(Parent { id: 1, children: vec![1, 2] }));
        assert_eq!(denormalizer.finish(), Some(Parent { id: 2, children: vec![3] }));
        assert_eq!(denormalizer.finish(), None);
    }

    #[test]
    fn interleaved_input_splits_aggregates() {
        // Documents the contract: unsorted rows are not detected.
        let rows = vec![(1, Some(1)), (2, Some(2)), (1, Some(3))];
        let parents: Vec<Parent> = denormalize_iter(two_level(), rows).collect();
        assert_eq!(parents.len(), 3);
    }

    /// `(order_id, line_id, allocation_id)`.
    type ThreeLevelRow = (i64, Option<i64>, Option<i64>);

    #[derive(Debug, PartialEq)]
    struct Line {
        id: i64,
        allocations: Vec<i64>,
    }

    #[derive(Debug, PartialEq)]
    struct Order {
        id: i64,
        lines: Vec<Line>,
    }

    type LineShell = (i64, Children<i64, i64>);

    fn three_level() -> impl AggregateShape<Row = ThreeLevelRow, Output = Order> {
        shape_fn(
            |row: &ThreeLevelRow| row.0,
            |row: &ThreeLevelRow| (row.0, Children::<i64, LineShell>::new()),
            |shell: &mut (i64, Children<i64, LineShell>), row: ThreeLevelRow| {
                let (_, line_id, allocation_id) = row;
                if let Some(line) = shell
                    .1
                    .upsert_last(line_id, || (line_id.unwrap_or_default(), Children::new()))
                {
                    line.1.upsert_last(allocation_id, || allocation_id.unwrap_or_default());
                }
            },
            |(id, lines): (i64, Children<i64, LineShell>)| Order {
                id,
                lines: lines
                    .into_vec()
                    .into_iter()
                    .map(|(id, allocations)| Line {
                        id,
                        allocations: allocations.into_vec(),
                    })
                    .collect(),
            },
        )
    }

    #[test]
    fn three_levels_nest_and_skip_missing_grandchildren() {
        let rows = vec![
            (1, Some(10), Some(100)),
            (1, Some(10), Some(101)),
            (1, Some(11), None),
            (2, None, None),
            (3, Some(30), Some(300)),
        ];
        let orders: Vec<Order> = denormalize_iter(three_level(), rows).collect();
        assert_eq!(
            orders,
            vec![
                Order {
                    id: 1,
                    lines: vec![
                        Line { id: 10, allocations: vec![100, 101] },
                        Line { id: 11, allocations: vec![] },
                    ],
                },
                Order { id: 2, lines: vec![] },
                Order {
                    id: 3,
                    lines: vec![Line { id: 30, allocations: vec![300] }],
                },
            ]
        );
    }

    #[tokio::test]
    async fn stream_collects_all_aggregates() {
        let rows = tokio_stream::iter(
            vec![(1, Some(1)), (1, Some(2)), (2, None)]
                .into_iter()
                .map(Ok::<_, String>),
        );
        let parents = collect_aggregates(two_level(), rows).await.unwrap();
        assert_eq!(
            parents,
            vec![
                Parent { id: 1, children: vec![1, 2] },
                Parent { id: 2, children: vec![] },
            ]
        );
    }

    #[tokio::test]
    async fn stream_error_discards_everything() {
        let rows = tokio_stream::iter(vec![
            Ok((1, Some(1))),
            Ok((2, Some(2))),
            Err("decode failed".to_string()),
            Ok((3, Some(3))),
        ]);
        let result = collect_aggregates(two_level(), rows).await;
        assert_eq!(result, Err("decode failed".to_string()));
    }

    #[tokio::test]
    async fn stream_yields_sealed_aggregates_before_the_end() {
        let rows = tokio_stream::iter(vec![Ok::<_, String>((1, Some(1))), Ok((2, Some(2)))]);
        let mut aggregates = std::pin::pin!(denormalize(two_level(), rows));
        let first = aggregates.next().await;
        assert_eq!(first, Some(Ok(Parent { id: 1, children: vec![1] })));
        let second = aggregates.next().await;
        assert_eq!(second, Some(Ok(Parent { id: 2, children: vec![2] })));
        assert!(aggregates.next().await.is_none());
    }
}
