use criterion::{black_box, criterion_group, criterion_main, Criterion};
use muso::nodes::{Filter, FilterMessage, Gain};
use muso::protocol::{block_channel, AudioBlock, ConsumerMessage};
use muso::{assemble, CallbackConsumer, SessionConfig, SignalChain, ToneEngine};

const SAMPLE_RATE: u32 = 48_000;
const QUANTUM: usize = 128;

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("CallbackConsumer.process_quantum()", |b| {
        let (callback, mut render) = block_channel(3, 64);
        let mut consumer = CallbackConsumer::new(callback, QUANTUM);
        let mut left = [0.0; QUANTUM];
        let mut right = [0.0; QUANTUM];
        let mut spare = Some(AudioBlock::new(QUANTUM));

        b.iter(|| {
            // keep exactly one block in flight, reusing whatever comes back
            if let Some(block) = spare.take() {
                let _ = render.send(ConsumerMessage::Block(block));
            }
            consumer.process_quantum(black_box(&mut left), black_box(&mut right));
            while let Some(message) = render.recv() {
                if let muso::BridgeMessage::Recycle(block) = message {
                    spare = Some(block);
                }
            }
        })
    });

    c.bench_function("SignalChain.process() settled", |b| {
        let (tap, _analyser) = muso::spectrum::tap(2048, 0.8, SAMPLE_RATE).unwrap();
        let mut chain = SignalChain::new(SAMPLE_RATE, QUANTUM);
        chain.add(tap).unwrap();
        chain.add(Filter::new(1_000.0, 0.7, SAMPLE_RATE)).unwrap();
        chain.add(Gain::new(0.8)).unwrap();
        let mut left = [0.1; QUANTUM];
        let mut right = [0.1; QUANTUM];

        b.iter(|| chain.process(black_box(&mut left), black_box(&mut right)))
    });

    c.bench_function("Filter sweep", |b| {
        let (tap, _analyser) = muso::spectrum::tap(2048, 0.8, SAMPLE_RATE).unwrap();
        let mut chain = SignalChain::new(SAMPLE_RATE, QUANTUM);
        chain.add(tap).unwrap();
        let mut filter = chain.add(Filter::new(20_000.0, 0.7, SAMPLE_RATE)).unwrap();
        let mut left = [0.1; QUANTUM];
        let mut right = [0.1; QUANTUM];
        let mut high = false;

        b.iter(|| {
            // retarget every quantum so coefficients are recomputed per sample
            high = !high;
            let _ = filter.send(FilterMessage::SetCutoff(if high { 8_000.0 } else { 200.0 }));
            chain.process(black_box(&mut left), black_box(&mut right))
        })
    });

    c.bench_function("QuantumDriver + BufferBridge round trip", |b| {
        let mut parts =
            assemble(&SessionConfig::default(), SAMPLE_RATE, ToneEngine::default()).unwrap();
        parts.prime().unwrap();
        let mut out = [0.0; 2 * 480];

        b.iter(|| {
            parts.driver.fill_interleaved(black_box(&mut out), 2);
            parts.bridge.poll().unwrap();
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
