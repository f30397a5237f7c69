// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Subnet Planning
//!
//! Whatever the VPC block, group layout and zone count, planned subnets must
//! stay inside the VPC, never overlap, and come out in group-then-zone order.

use std::net::Ipv4Addr;

use popular_vote_infrastructure::domain::{plan_subnets, Ipv4Cidr, SubnetGroup, SubnetType};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn vpc_block() -> impl Strategy<Value = Ipv4Cidr> {
    (any::<u32>(), 8u8..=20).prop_map(|(address, prefix)| {
        let mask = u32::MAX << (32 - prefix);
        Ipv4Cidr::from_parts(Ipv4Addr::from(address & mask), prefix)
            .expect("masked address is a network address")
    })
}

fn subnet_type() -> impl Strategy<Value = SubnetType> {
    prop_oneof![
        Just(SubnetType::Public),
        Just(SubnetType::PrivateWithEgress),
        Just(SubnetType::PrivateIsolated),
    ]
}

fn groups() -> impl Strategy<Value = Vec<SubnetGroup>> {
    prop::collection::vec(subnet_type(), 1..=3).prop_map(|types| {
        types
            .into_iter()
            .enumerate()
            .map(|(i, subnet_type)| SubnetGroup::new(format!("Group{}", i), subnet_type))
            .collect()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// One subnet per group per zone, all inside the VPC
    #[test]
    fn prop_subnets_fit_inside_vpc(vpc in vpc_block(), groups in groups(), zones in 1usize..=3) {
        let planned = plan_subnets(&vpc, &groups, zones).unwrap();

        prop_assert_eq!(planned.len(), groups.len() * zones);
        for subnet in &planned {
            prop_assert!(vpc.contains(&subnet.cidr), "{} not inside {}", subnet.cidr, vpc);
        }
    }

    /// No two planned subnets share an address
    #[test]
    fn prop_subnets_never_overlap(vpc in vpc_block(), groups in groups(), zones in 1usize..=3) {
        let planned = plan_subnets(&vpc, &groups, zones).unwrap();

        for (i, a) in planned.iter().enumerate() {
            for b in &planned[i + 1..] {
                prop_assert!(!a.cidr.overlaps(&b.cidr), "{} overlaps {}", a.cidr, b.cidr);
            }
        }
    }

    /// Output is ordered by group, then zone
    #[test]
    fn prop_group_then_zone_order(vpc in vpc_block(), groups in groups(), zones in 1usize..=3) {
        let planned = plan_subnets(&vpc, &groups, zones).unwrap();

        for (index, subnet) in planned.iter().enumerate() {
            prop_assert_eq!(&subnet.group, &groups[index / zones].name);
            prop_assert_eq!(subnet.subnet_type, groups[index / zones].subnet_type);
            prop_assert_eq!(subnet.availability_zone, index % zones);
        }
    }

    /// Implicitly sized subnets of one plan are all the same size
    #[test]
    fn prop_implicit_subnets_share_a_size(vpc in vpc_block(), groups in groups(), zones in 1usize..=3) {
        let planned = plan_subnets(&vpc, &groups, zones).unwrap();
        let first = planned[0].cidr.prefix_length();
        prop_assert!(planned.iter().all(|s| s.cidr.prefix_length() == first));
    }

    /// Planning is a pure function of its inputs
    #[test]
    fn prop_planning_is_deterministic(vpc in vpc_block(), groups in groups(), zones in 1usize..=3) {
        prop_assert_eq!(
            plan_subnets(&vpc, &groups, zones).unwrap(),
            plan_subnets(&vpc, &groups, zones).unwrap()
        );
    }
}
