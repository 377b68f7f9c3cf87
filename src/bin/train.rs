use neurogen::*;

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

type Example = (Vec<f64>, Vec<f64>);

/// Points on a noisy unit circle, labelled by the sign of `x * y`.
fn generate_data(num_samples: usize) -> Vec<Example> {
    let mut rng = rand::thread_rng();
    let radians = Uniform::new(0.0, 2.0 * std::f64::consts::PI);
    let noise = Normal::new(0.0, 0.1).expect("valid standard deviation");

    let mut data = Vec::new();
    for _ in 0..num_samples {
        let theta = radians.sample(&mut rng);
        let dx = noise.sample(&mut rng);
        let dy = noise.sample(&mut rng);
        let point = vec![theta.cos() + dx, theta.sin() + dy];
        let class = if point[0] * point[1] > 0.0 {
            vec![1.0, 0.0]
        } else {
            vec![0.0, 1.0]
        };
        data.push((point, class));
    }
    data
}

fn accuracy(network: &mut Network, test_data: &[Example]) -> f64 {
    let mut num_correct = 0;
    for (input, expected) in test_data {
        let output = network.run(input).expect("input matches the network");
        let class = if output[0] > output[1] { 0 } else { 1 };
        if expected[class] == 1.0 {
            num_correct += 1;
        }
    }
    num_correct as f64 / test_data.len() as f64
}

fn topology() -> Network {
    let mut network = Network::new(LossFunction::ErrorSquared, 0.1);
    network.add_input_layer(2).expect("empty network");
    network
        .add_fully_connected_layer(5, Activator::Sigmoid, true)
        .expect("valid layer");
    network
        .add_fully_connected_layer(5, Activator::Sigmoid, true)
        .expect("valid layer");
    network
        .add_fully_connected_layer(2, Activator::Sigmoid, true)
        .expect("valid layer");
    network
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let training_data = generate_data(2_000);
    let test_data = generate_data(500);

    let mut network = Trainer::new(topology())
        .stop_condition(StopCondition::Iterations(50))
        .logging(Logging::Iterations(10))
        .train(&training_data)
        .expect("examples match the network");
    println!("{}", network);
    println!("Gradient descent: {:.1}% correct", 100.0 * accuracy(&mut network, &test_data));

    let mut rng = rand::thread_rng();
    let mut population: Vec<Network> = (0..20).map(|_| topology()).collect();
    for generation in 0..30 {
        let sample: Vec<Example> = (0..100)
            .map(|_| training_data[rng.gen_range(0..training_data.len())].clone())
            .collect();
        let mut scored: Vec<(f64, Network)> = population
            .into_iter()
            .map(|mut n| (accuracy(&mut n, &sample), n))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        println!("Generation {}: best {:.1}%", generation, 100.0 * scored[0].0);

        let winners: Vec<Network> = scored.into_iter().take(5).map(|(_, n)| n).collect();
        population = Network::mutate(&winners, 20).expect("winners share a topology");
    }
    let best = population
        .iter_mut()
        .map(|n| accuracy(n, &test_data))
        .fold(0.0, f64::max);
    println!("Evolution: {:.1}% correct", 100.0 * best);
}
