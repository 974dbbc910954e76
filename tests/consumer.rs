use muso::protocol::{block_channel, AudioBlock, BridgeMessage, ConsumerMessage, RenderEnd};
use muso::{CallbackConsumer, ConsumerState};

const QUANTUM: usize = 128;

fn consumer() -> (CallbackConsumer, RenderEnd) {
    let (callback, render) = block_channel(3, 64);
    (CallbackConsumer::new(callback, QUANTUM), render)
}

/// Interleaved ramp: left = 0, 2, 4, ... right = 1, 3, 5, ...
fn ramp_block(frames: usize) -> AudioBlock {
    AudioBlock::from_interleaved((0..frames * 2).map(|i| i as f32).collect())
}

fn drain(render: &mut RenderEnd) -> Vec<BridgeMessage> {
    std::iter::from_fn(|| render.recv()).collect()
}

#[test]
/// Nothing delivered yet: silence and exactly one pull for one quantum
fn first_quantum_is_silent_and_pulls_once() {
    let (mut consumer, mut render) = consumer();
    let mut left = vec![1.0; QUANTUM];
    let mut right = vec![1.0; QUANTUM];

    consumer.process_quantum(&mut left, &mut right);

    assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));

    let messages = drain(&mut render);
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        BridgeMessage::Pull { frames } => assert_eq!(*frames, QUANTUM),
        other => panic!("expected a pull, got {other:?}"),
    }

    assert_eq!(consumer.state(), ConsumerState::Requesting);
    let stats = consumer.stats();
    assert_eq!(stats.snapshot().underruns, 1);
    assert!(stats.check_underrun());
    assert!(!stats.check_underrun());
}

#[test]
fn delivered_block_is_deinterleaved_and_not_reused() {
    let (mut consumer, mut render) = consumer();
    render.send(ConsumerMessage::Block(ramp_block(QUANTUM))).unwrap();

    let mut left = vec![0.0; QUANTUM];
    let mut right = vec![0.0; QUANTUM];
    consumer.process_quantum(&mut left, &mut right);

    for i in 0..QUANTUM {
        assert_eq!(left[i], (2 * i) as f32);
        assert_eq!(right[i], (2 * i + 1) as f32);
    }
    assert_eq!(consumer.state(), ConsumerState::Idle);

    // the spent block goes back first, then the request for the next one
    let messages = drain(&mut render);
    assert_eq!(messages.len(), 2);
    match &messages[0] {
        BridgeMessage::Recycle(block) => assert!(block.holds_frames(QUANTUM)),
        other => panic!("expected recycle, got {other:?}"),
    }
    assert!(matches!(messages[1], BridgeMessage::Pull { frames: QUANTUM }));

    consumer.process_quantum(&mut left, &mut right);
    assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    assert_eq!(consumer.state(), ConsumerState::Requesting);

    let snapshot = consumer.stats().snapshot();
    assert_eq!(snapshot.quanta, 2);
    assert_eq!(snapshot.delivered, 1);
    assert_eq!(snapshot.underruns, 1);
}

#[test]
fn queued_blocks_report_has_block() {
    let (mut consumer, mut render) = consumer();
    render.send(ConsumerMessage::Block(ramp_block(QUANTUM))).unwrap();
    render.send(ConsumerMessage::Block(ramp_block(QUANTUM))).unwrap();

    let mut left = vec![0.0; QUANTUM];
    let mut right = vec![0.0; QUANTUM];

    consumer.process_quantum(&mut left, &mut right);
    assert_eq!(consumer.state(), ConsumerState::HasBlock);

    consumer.process_quantum(&mut left, &mut right);
    assert_eq!(consumer.state(), ConsumerState::Idle);
    assert_eq!(consumer.stats().snapshot().delivered, 2);
}

#[test]
fn mis_sized_block_is_discarded() {
    let (mut consumer, mut render) = consumer();
    render
        .send(ConsumerMessage::Block(ramp_block(QUANTUM - 1)))
        .unwrap();

    let mut left = vec![1.0; QUANTUM];
    let mut right = vec![1.0; QUANTUM];
    consumer.process_quantum(&mut left, &mut right);

    assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));

    let snapshot = consumer.stats().snapshot();
    assert_eq!(snapshot.discarded, 1);
    assert_eq!(snapshot.delivered, 0);
    assert_eq!(snapshot.underruns, 1);

    let messages = drain(&mut render);
    assert!(matches!(messages[0], BridgeMessage::Recycle(_)));
    assert!(matches!(messages[1], BridgeMessage::Pull { frames: QUANTUM }));
}

#[test]
fn odd_sample_count_is_discarded() {
    let (mut consumer, mut render) = consumer();
    let mut samples = vec![0.5; QUANTUM * 2];
    samples.push(0.5);
    render
        .send(ConsumerMessage::Block(AudioBlock::from_interleaved(samples)))
        .unwrap();

    let mut left = vec![0.0; QUANTUM];
    let mut right = vec![0.0; QUANTUM];
    consumer.process_quantum(&mut left, &mut right);

    assert!(left.iter().all(|&s| s == 0.0));
    assert_eq!(consumer.stats().snapshot().discarded, 1);
}

#[test]
fn only_the_first_configure_counts() {
    let (mut consumer, mut render) = consumer();
    assert_eq!(consumer.sample_rate(), None);

    render
        .send(ConsumerMessage::Configure { sample_rate: 48_000.0 })
        .unwrap();
    render
        .send(ConsumerMessage::Configure { sample_rate: 44_100.0 })
        .unwrap();
    render.send(ConsumerMessage::Block(ramp_block(QUANTUM))).unwrap();

    let mut left = vec![0.0; QUANTUM];
    let mut right = vec![0.0; QUANTUM];
    consumer.process_quantum(&mut left, &mut right);

    assert_eq!(consumer.sample_rate(), Some(48_000.0));
    let snapshot = consumer.stats().snapshot();
    assert_eq!(snapshot.ignored_configures, 1);
    assert_eq!(snapshot.delivered, 1);
}

#[test]
fn nonsense_sample_rate_is_ignored() {
    let (mut consumer, mut render) = consumer();
    render
        .send(ConsumerMessage::Configure { sample_rate: f32::NAN })
        .unwrap();

    let mut left = vec![0.0; QUANTUM];
    let mut right = vec![0.0; QUANTUM];
    consumer.process_quantum(&mut left, &mut right);

    assert_eq!(consumer.sample_rate(), None);
    assert_eq!(consumer.stats().snapshot().ignored_configures, 1);
}

#[test]
fn wrong_output_length_plays_silence_without_pulling() {
    let (mut consumer, mut render) = consumer();
    render.send(ConsumerMessage::Block(ramp_block(QUANTUM))).unwrap();

    let mut left = vec![1.0; QUANTUM / 2];
    let mut right = vec![1.0; QUANTUM / 2];
    consumer.process_quantum(&mut left, &mut right);

    assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    assert!(render.recv().is_none());
    // the block is still waiting for a correctly sized call
    assert_eq!(consumer.stats().snapshot().delivered, 0);
}

#[test]
/// A stalled bridge cannot crowd spent blocks out of the return queue
fn starved_pulls_leave_room_for_recycling() {
    // block queue holds 2, return queue holds 4
    let (callback, mut render) = block_channel(1, 4);
    let mut consumer = CallbackConsumer::new(callback, QUANTUM);
    let mut left = vec![0.0; QUANTUM];
    let mut right = vec![0.0; QUANTUM];

    for _ in 0..10 {
        consumer.process_quantum(&mut left, &mut right);
    }
    assert_eq!(consumer.stats().snapshot().underruns, 10);

    // the bridge wakes up and delivers without reading the return queue
    render.send(ConsumerMessage::Block(ramp_block(QUANTUM))).unwrap();
    render.send(ConsumerMessage::Block(ramp_block(QUANTUM))).unwrap();
    consumer.process_quantum(&mut left, &mut right);
    consumer.process_quantum(&mut left, &mut right);

    let snapshot = consumer.stats().snapshot();
    assert_eq!(snapshot.delivered, 2);
    assert_eq!(snapshot.dropped_messages, 0);

    let messages = drain(&mut render);
    let pulls = messages
        .iter()
        .filter(|m| matches!(m, BridgeMessage::Pull { .. }))
        .count();
    let recycled = messages
        .iter()
        .filter(|m| matches!(m, BridgeMessage::Recycle(_)))
        .count();
    assert_eq!(pulls, 2);
    assert_eq!(recycled, 2);
}
