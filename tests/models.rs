use compartmental::analysis::{ensemble_mean, ensemble_percentile, interpolate_simulation_result};
use compartmental::core::AgeGroup;
use compartmental::integrator::{
    EulerIntegratorCore, ImplicitEulerIntegratorCore, RungeKuttaIntegratorCore,
};
use compartmental::models::secir::{InfectionState as Secir, SecirModel};
use compartmental::models::sir::{InfectionState as Sir, SirModel};
use compartmental::models::ParameterSampling;
use compartmental::simulation::{
    CompartmentalModel, FlowModel, FlowSimulation, Simulation, simulate, simulate_flows,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn sir() -> SirModel {
    let mut model = SirModel::new();
    model.populations.set((Sir::Infected,), 1000.);
    model.populations.set((Sir::Recovered,), 1000.);
    model
        .populations
        .set_difference_from_total((Sir::Susceptible,), 1061000.);
    model.parameters.time_infected.set_value(2.);
    model
        .parameters
        .transmission_probability_on_contact
        .set_value(1.);
    let contacts = model.parameters.contact_patterns.get_contact_matrices_mut();
    contacts[0].get_baseline_mut().fill(2.7);
    contacts[0].add_damping_factor(0.6, 12.5);
    model
}

fn secir() -> SecirModel<1> {
    let mut model = SecirModel::<1>::new();
    let age = AgeGroup::<1>(0);
    model.populations.set((age, Secir::Exposed), 100.);
    model.populations.set((age, Secir::Carrier), 50.);
    model.populations.set((age, Secir::Infected), 50.);
    model.populations.set((age, Secir::Hospitalized), 20.);
    model.populations.set((age, Secir::IntensiveCare), 10.);
    model.populations.set((age, Secir::Recovered), 10.);
    model
        .populations
        .set_difference_from_total((age, Secir::Susceptible), 10000.);

    let parameters = &mut model.parameters;
    parameters.icu_capacity.set_value(20.);
    parameters.test_and_trace_capacity.set_value(10.);
    parameters.max_risk_of_infection_from_symptomatic[0].set_value(0.5);
    parameters.risk_of_infection_from_symptomatic[0].set_value(0.25);
    parameters.recovered_per_infected_no_symptoms[0].set_value(0.09);
    parameters.severe_per_infected_symptoms[0].set_value(0.2);
    parameters.critical_per_severe[0].set_value(0.25);
    parameters.deaths_per_critical[0].set_value(0.3);
    parameters.transmission_probability_on_contact[0].set_value(0.05);
    let contacts = parameters.contact_patterns.get_contact_matrices_mut();
    contacts[0].get_baseline_mut().fill(10.);
    contacts[0].add_damping_factor(0.7, 30.);
    model
}

#[test]
fn sir_euler_reaches_end_time() {
    let result = simulate(0., 1., 0.1, &sir(), Some(EulerIntegratorCore::new().into())).unwrap();
    assert!((result.get_last_time() - 1.).abs() < 1e-10);
    assert_eq!(result.get_num_time_points(), 11);
}

#[test]
fn secir_conserves_population() {
    let model = secir();
    assert_eq!(model.check_constraints(), 0);
    let result = simulate(0., 50., 0.1, &model, None).unwrap();
    assert_eq!(result.get_last_time(), 50.);
    assert!((result.get_last_value().sum() - 10000.).abs() < 1e-8);
}

#[test]
fn secir_integrators_agree() {
    let model = secir();
    let adaptive = simulate(0., 10., 0.1, &model, None).unwrap();
    let tight = RungeKuttaIntegratorCore::new(1e-12, 1e-10, 1e-8, 1.);
    let reference = simulate(0., 10., 0.1, &model, Some(tight.into())).unwrap();
    let implicit = simulate(
        0.,
        10.,
        0.01,
        &model,
        Some(ImplicitEulerIntegratorCore::default().into()),
    )
    .unwrap();

    let expected = reference.get_last_value();
    for (a, b) in adaptive.get_last_value().iter().zip(expected.iter()) {
        assert!((a - b).abs() < 1e-2 * b.abs().max(1.));
    }
    for (a, b) in implicit.get_last_value().iter().zip(expected.iter()) {
        assert!((a - b).abs() < 5e-2 * b.abs().max(1.));
    }
}

#[test]
fn secir_flows_reconstruct_compartments() {
    let model = secir();
    let (populations, flows) = simulate_flows(0., 20., 0.1, &model, None).unwrap();
    let initial = model.get_initial_values();
    let last_flows = flows.get_last_value();

    let mut expected = initial.clone();
    model.flows_to_derivatives(last_flows, expected.view_mut());
    expected += &initial;
    for (a, b) in populations.get_last_value().iter().zip(expected.iter()) {
        assert!((a - b).abs() < 1e-8);
    }
}

#[test]
fn simulations_advance_in_steps() {
    let mut simulation = Simulation::new(secir(), 0., 0.1);
    simulation.advance(10.).unwrap();
    simulation.advance(20.).unwrap();
    assert_eq!(simulation.get_result().get_last_time(), 20.);

    let mut flow_simulation = FlowSimulation::new(secir(), 0., 0.1);
    flow_simulation.advance(10.).unwrap();
    flow_simulation.advance(20.).unwrap();
    let reference = simulation.get_result().get_last_value();
    for (a, b) in flow_simulation
        .get_result()
        .get_last_value()
        .iter()
        .zip(reference.iter())
    {
        assert!((a - b).abs() < 1e-3 * b.abs().max(1.));
    }
}

#[test]
fn sampled_ensemble() {
    let mut model = secir();
    model.set_params_distributions_normal(0.1);

    let ensemble: Vec<_> = (0..8)
        .map(|run| {
            let mut rng = StdRng::seed_from_u64(run);
            let mut sample = model.clone();
            sample.draw_sample(&mut rng);
            assert_eq!(sample.check_constraints(), 0);
            let result = simulate(0., 10., 0.1, &sample, None).unwrap();
            interpolate_simulation_result(&result)
        })
        .collect();

    let mean = ensemble_mean(&ensemble);
    let low = ensemble_percentile(&ensemble, 0.05);
    let high = ensemble_percentile(&ensemble, 0.95);
    assert_eq!(mean.get_num_time_points(), 11);
    for index in 0..mean.get_num_time_points() {
        for element in 0..mean.get_num_elements() {
            assert!(low.get_value(index)[element] <= high.get_value(index)[element]);
        }
        assert!((mean.get_value(index).sum() - 10000.).abs() < 1e-6);
    }
}
