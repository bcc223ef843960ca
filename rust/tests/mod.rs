mod keeper_scenarios;
